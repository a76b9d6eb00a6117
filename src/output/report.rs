//! Report structures summarizing a match run

use crate::pipeline::{MatchRun, PostingState};
use crate::processing::posting::Posting;
use crate::processing::verdict::{JudgeFailure, Tri};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A match run prepared for presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub summary: RunSummary,

    /// One entry per evaluated posting, in rank order
    pub entries: Vec<PostingEntry>,

    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Postings loaded
    pub total_postings: usize,
    /// Postings that made the ranked shortlist
    pub ranked: usize,
    pub rule_rejected: usize,
    /// Postings sent to the model
    pub judged: usize,
    pub llm_rejected: usize,
    pub accepted: usize,
    /// Model verdicts that fell back to all-unknown
    pub degraded: usize,
    pub stopped_early: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingEntry {
    pub rank: usize,
    pub posting_id: u64,
    pub label: String,
    pub state: PostingState,
    pub accepted: bool,
    /// Rule checks that failed, or `description` when it was missing
    pub failed_rules: Vec<String>,
    /// Model checks that were false
    pub rejected_attributes: Vec<String>,
    /// Model checks the model could not decide
    pub unknown_attributes: Vec<String>,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub model_used: String,
    pub query: String,
    pub profile_file: String,
    pub postings_file: String,
}

impl MatchReport {
    pub fn from_run(run: &MatchRun, postings: &[Posting], profile_file: &str, postings_file: &str) -> Self {
        // first copy of a duplicated id is the one the pipeline judged
        let mut by_id: HashMap<u64, &Posting> = HashMap::new();
        for posting in postings {
            by_id.entry(posting.id).or_insert(posting);
        }

        let entries: Vec<PostingEntry> = run
            .results
            .iter()
            .map(|result| {
                let label = by_id
                    .get(&result.posting_id)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| format!("#{}", result.posting_id));

                let failed_rules = match &result.rule_verdict {
                    Some(verdict) => verdict
                        .failed_checks()
                        .iter()
                        .map(|c| c.name().to_string())
                        .collect(),
                    None => vec!["description".to_string()],
                };

                let (rejected_attributes, unknown_attributes, failure) = match &result.attribute_verdict {
                    Some(verdict) => {
                        let with_value = |wanted: Tri| {
                            verdict
                                .checks
                                .iter()
                                .filter(|(_, &value)| value == wanted)
                                .map(|(check, _)| check.name().to_string())
                                .collect::<Vec<_>>()
                        };
                        (
                            with_value(Tri::False),
                            with_value(Tri::Unknown),
                            verdict.failure.as_ref().map(describe_failure),
                        )
                    }
                    None => (Vec::new(), Vec::new(), None),
                };

                PostingEntry {
                    rank: result.rank,
                    posting_id: result.posting_id,
                    label,
                    state: result.state,
                    accepted: result.accepted,
                    failed_rules,
                    rejected_attributes,
                    unknown_attributes,
                    failure,
                }
            })
            .collect();

        let summary = RunSummary {
            total_postings: postings.len(),
            ranked: run.ranked_ids.len(),
            rule_rejected: run.count(PostingState::RuleRejected),
            judged: run.judged_count(),
            llm_rejected: run.count(PostingState::LlmRejected),
            accepted: run.accepted.len(),
            degraded: entries.iter().filter(|e| e.failure.is_some()).count(),
            stopped_early: run.stopped_early,
        };

        Self {
            summary,
            entries,
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                started_at: run.started_at,
                processing_time_ms: run.elapsed_ms,
                model_used: run.model.clone(),
                query: run.query.clone(),
                profile_file: profile_file.to_string(),
                postings_file: postings_file.to_string(),
            },
        }
    }

    pub fn accepted_entries(&self) -> impl Iterator<Item = &PostingEntry> {
        self.entries.iter().filter(|e| e.accepted)
    }
}

fn describe_failure(failure: &JudgeFailure) -> String {
    match failure {
        JudgeFailure::UnparsableResponse => "unparsable model response".to_string(),
        JudgeFailure::TransportTimeout => "model call timed out".to_string(),
        JudgeFailure::Transport(message) => format!("model call failed: {}", message),
    }
}
