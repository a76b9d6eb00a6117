//! Match pipeline: rank postings, apply rule checks, then ask the model
//!
//! Each posting moves through
//! `Pending -> RuleRejected | RuleAccepted -> LlmAccepted | LlmRejected`.
//! Only `LlmAccepted` postings are returned, in rank order.

pub mod query;

use crate::config::{Config, RuleThresholds};
use crate::error::{JobFilterError, Result};
use crate::llm::client::{CompletionOptions, LanguageModelClient};
use crate::llm::judge::{AttributeJudge, JudgeOptions};
use crate::processing::posting::{Posting, Profile};
use crate::processing::retrieval::{Bm25Params, RetrievalIndex};
use crate::processing::rule_filter::RuleFilter;
use crate::processing::verdict::{AttributeVerdict, RuleVerdict};
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use log::{debug, info, warn};
use query::{QueryBuilder, QueryStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Everything a pipeline needs, passed in explicitly.
#[derive(Clone)]
pub struct PipelineConfig {
    pub language_model_client: Arc<dyn LanguageModelClient>,
    pub index_builder: Bm25Params,
    pub rule_thresholds: RuleThresholds,
    pub judge_options: JudgeOptions,
    pub query_strategy: QueryStrategy,
    /// Ranked postings considered; `None` considers all.
    pub top_k: Option<usize>,
    /// Judgments in flight at once.
    pub max_concurrency: usize,
    /// Stop once this many postings were accepted.
    pub max_accepted: Option<usize>,
}

impl PipelineConfig {
    pub fn new(language_model_client: Arc<dyn LanguageModelClient>) -> Self {
        Self {
            language_model_client,
            index_builder: Bm25Params::default(),
            rule_thresholds: RuleThresholds::default(),
            judge_options: JudgeOptions::default(),
            query_strategy: QueryStrategy::default(),
            top_k: None,
            max_concurrency: 1,
            max_accepted: None,
        }
    }

    pub fn from_config(config: &Config, language_model_client: Arc<dyn LanguageModelClient>) -> Self {
        Self {
            language_model_client,
            index_builder: Bm25Params {
                k1: config.retrieval.k1,
                b: config.retrieval.b,
            },
            rule_thresholds: config.rules.clone(),
            judge_options: JudgeOptions {
                completion: CompletionOptions {
                    max_output_tokens: config.llm.max_output_tokens,
                    temperature: config.llm.temperature,
                },
                timeout: Duration::from_secs(config.llm.timeout_secs),
            },
            query_strategy: QueryStrategy::from(&config.query),
            top_k: config.retrieval.top_k,
            max_concurrency: config.llm.max_concurrency,
            max_accepted: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingState {
    Pending,
    RuleRejected,
    RuleAccepted,
    LlmAccepted,
    LlmRejected,
}

impl PostingState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PostingState::RuleRejected | PostingState::LlmAccepted | PostingState::LlmRejected
        )
    }
}

/// Outcome for one ranked posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub posting_id: u64,
    /// Position in rank order, starting at 1.
    pub rank: usize,
    pub state: PostingState,
    pub accepted: bool,
    /// `None` when the posting had no description.
    pub rule_verdict: Option<RuleVerdict>,
    /// Present only when every rule check passed.
    pub attribute_verdict: Option<AttributeVerdict>,
}

impl MatchResult {
    fn rule_rejected(posting_id: u64, rank: usize, rule_verdict: Option<RuleVerdict>) -> Self {
        Self {
            posting_id,
            rank,
            state: PostingState::RuleRejected,
            accepted: false,
            rule_verdict,
            attribute_verdict: None,
        }
    }

    fn judged(posting_id: u64, rank: usize, rule_verdict: RuleVerdict, verdict: AttributeVerdict) -> Self {
        let state = if verdict.passed() {
            PostingState::LlmAccepted
        } else {
            PostingState::LlmRejected
        };
        Self {
            posting_id,
            rank,
            state,
            accepted: state == PostingState::LlmAccepted,
            rule_verdict: Some(rule_verdict),
            attribute_verdict: Some(verdict),
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRun {
    pub query: String,
    pub ranked_ids: Vec<u64>,
    /// Results in rank order; postings skipped by an early stop are absent.
    pub results: Vec<MatchResult>,
    pub accepted: Vec<Posting>,
    pub stopped_early: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub model: String,
}

impl MatchRun {
    pub fn count(&self, state: PostingState) -> usize {
        self.results.iter().filter(|r| r.state == state).count()
    }

    pub fn judged_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.attribute_verdict.is_some())
            .count()
    }
}

pub struct MatchPipeline {
    rule_filter: RuleFilter,
    judge: AttributeJudge,
    query_builder: QueryBuilder,
    index_params: Bm25Params,
    top_k: Option<usize>,
    max_concurrency: usize,
    max_accepted: Option<usize>,
    model: String,
}

impl MatchPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        if config.max_concurrency == 0 {
            return Err(JobFilterError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        let client = config.language_model_client;
        let query_builder = QueryBuilder::new(
            config.query_strategy,
            Arc::clone(&client),
            config.judge_options.completion,
            config.judge_options.timeout,
        );

        Ok(Self {
            rule_filter: RuleFilter::new(&config.rule_thresholds)?,
            model: client.model_name().to_string(),
            judge: AttributeJudge::new(client, config.judge_options),
            query_builder,
            index_params: config.index_builder,
            top_k: config.top_k,
            max_concurrency: config.max_concurrency,
            max_accepted: config.max_accepted,
        })
    }

    /// Accepted postings in rank order.
    pub async fn run(&self, profile: &Profile, postings: &[Posting]) -> Vec<Posting> {
        self.run_detailed(profile, postings).await.accepted
    }

    pub async fn run_detailed(&self, profile: &Profile, postings: &[Posting]) -> MatchRun {
        self.run_with_progress(profile, postings, CancellationToken::new(), |_| {})
            .await
    }

    /// Stops issuing judgments once `cancel` fires; in-flight ones are dropped.
    pub async fn run_with_cancel(
        &self,
        profile: &Profile,
        postings: &[Posting],
        cancel: CancellationToken,
    ) -> MatchRun {
        self.run_with_progress(profile, postings, cancel, |_| {}).await
    }

    /// Like `run_with_cancel`, calling `observer` for each result as it lands.
    pub async fn run_with_progress<F>(
        &self,
        profile: &Profile,
        postings: &[Posting],
        cancel: CancellationToken,
        mut observer: F,
    ) -> MatchRun
    where
        F: FnMut(&MatchResult),
    {
        let started_at = Utc::now();
        let start = Instant::now();

        let postings = dedupe_by_id(postings);
        if postings.is_empty() {
            info!("{}; nothing to match", JobFilterError::CorpusEmpty);
            return MatchRun {
                query: String::new(),
                ranked_ids: Vec::new(),
                results: Vec::new(),
                accepted: Vec::new(),
                stopped_early: false,
                started_at,
                elapsed_ms: start.elapsed().as_millis() as u64,
                model: self.model.clone(),
            };
        }

        let index = RetrievalIndex::build(postings.iter().copied(), self.index_params);
        let query = self.query_builder.build(profile).await;
        let ranked_ids = index.rank(&query, self.top_k);
        info!(
            "Ranked {} of {} postings against the profile query",
            ranked_ids.len(),
            postings.len()
        );

        let by_id: HashMap<u64, &Posting> = postings.iter().map(|p| (p.id, *p)).collect();
        let ranked: Vec<&Posting> = ranked_ids
            .iter()
            .filter_map(|id| by_id.get(id).copied())
            .collect();

        let mut evaluations = std::pin::pin!(stream::iter(ranked.into_iter().enumerate())
            .map(|(position, posting)| self.evaluate(profile, posting, position + 1))
            .buffered(self.max_concurrency));

        let mut results = Vec::new();
        let mut accepted = Vec::new();
        let mut stopped_early = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Run cancelled after {} results", results.len());
                    stopped_early = true;
                    break;
                }
                next = evaluations.next() => next,
            };

            let Some(result) = next else { break };
            observer(&result);

            if result.accepted {
                if let Some(posting) = by_id.get(&result.posting_id) {
                    accepted.push((*posting).clone());
                }
            }
            results.push(result);

            if self.max_accepted.is_some_and(|max| accepted.len() >= max) {
                stopped_early = results.len() < ranked_ids.len();
                if stopped_early {
                    info!("Reached {} accepted postings, stopping early", accepted.len());
                }
                break;
            }
        }

        let run = MatchRun {
            query,
            ranked_ids,
            results,
            accepted,
            stopped_early,
            started_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
            model: self.model.clone(),
        };

        info!(
            "Run finished: {} accepted, {} rule-rejected, {} model-rejected in {}ms",
            run.accepted.len(),
            run.count(PostingState::RuleRejected),
            run.count(PostingState::LlmRejected),
            run.elapsed_ms
        );
        run
    }

    /// Rule checks, then the model only if every rule passed.
    async fn evaluate(&self, profile: &Profile, posting: &Posting, rank: usize) -> MatchResult {
        let rule_verdict = match self.rule_filter.evaluate(posting) {
            Ok(verdict) => verdict,
            Err(e) => {
                debug!("Posting {} rejected: {}", posting.id, e);
                return MatchResult::rule_rejected(posting.id, rank, None);
            }
        };

        if !rule_verdict.passed() {
            debug!(
                "Posting {} failed rule checks: {:?}",
                posting.id,
                rule_verdict.failed_checks()
            );
            return MatchResult::rule_rejected(posting.id, rank, Some(rule_verdict));
        }

        let verdict = self.judge.judge(profile, &posting.text()).await;
        debug!("Posting {} model verdict: {:?}", posting.id, verdict.checks);
        MatchResult::judged(posting.id, rank, rule_verdict, verdict)
    }
}

/// Keep the first posting for each id.
fn dedupe_by_id(postings: &[Posting]) -> Vec<&Posting> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(postings.len());
    for posting in postings {
        if seen.insert(posting.id) {
            unique.push(posting);
        } else {
            warn!("Duplicate posting id {}, keeping the first", posting.id);
        }
    }
    unique
}
