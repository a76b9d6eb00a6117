//! Deterministic eligibility checks over a posting

use crate::config::RuleThresholds;
use crate::error::{JobFilterError, Result};
use crate::processing::posting::Posting;
use crate::processing::text_normalizer::TextNormalizer;
use crate::processing::verdict::{Check, RuleVerdict};
use aho_corasick::AhoCorasick;
use std::collections::BTreeMap;
use whatlang::Lang;

/// Case-insensitive "contains any of" matcher for one keyword list.
struct KeywordSet {
    matcher: Option<AhoCorasick>,
}

impl KeywordSet {
    fn new(name: &str, keywords: &[String]) -> Result<Self> {
        let patterns: Vec<&str> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();

        if patterns.is_empty() {
            return Ok(Self { matcher: None });
        }

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&patterns)
            .map_err(|e| {
                JobFilterError::Processing(format!("Failed to build {} matcher: {}", name, e))
            })?;

        Ok(Self {
            matcher: Some(matcher),
        })
    }

    fn found_in(&self, text: &str) -> bool {
        self.matcher.as_ref().is_some_and(|m| m.is_match(text))
    }
}

pub struct RuleFilter {
    normalizer: TextNormalizer,
    min_company_size: u64,
    seniority: KeywordSet,
    startup: KeywordSet,
    full_time: KeywordSet,
    part_time: KeywordSet,
    remote: KeywordSet,
    temporary: KeywordSet,
    mlops: KeywordSet,
}

impl RuleFilter {
    pub fn new(thresholds: &RuleThresholds) -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::new(),
            min_company_size: thresholds.min_company_size,
            seniority: KeywordSet::new("seniority", &thresholds.seniority_keywords)?,
            startup: KeywordSet::new("startup", &thresholds.startup_keywords)?,
            full_time: KeywordSet::new("full-time", &thresholds.full_time_keywords)?,
            part_time: KeywordSet::new("part-time", &thresholds.part_time_keywords)?,
            remote: KeywordSet::new("remote", &thresholds.remote_keywords)?,
            temporary: KeywordSet::new("temporary", &thresholds.temporary_keywords)?,
            mlops: KeywordSet::new("mlops", &thresholds.mlops_keywords)?,
        })
    }

    /// Evaluate every rule check. Fails with `MissingField` when the posting
    /// has no description.
    pub fn evaluate(&self, posting: &Posting) -> Result<RuleVerdict> {
        let description = posting
            .description_text()
            .ok_or_else(|| JobFilterError::MissingField("description".to_string()))?;
        let text = self.normalizer.normalize(description);

        let mut checks = BTreeMap::new();
        checks.insert(Check::JuniorMid, !self.seniority.found_in(&text));
        checks.insert(Check::EnglishText, is_english(description));
        checks.insert(Check::CompanyEstablished, !self.startup.found_in(&text));
        checks.insert(Check::FullTime, self.is_full_time(&text));
        checks.insert(Check::Remote, self.remote.found_in(&text));
        checks.insert(
            Check::CompanySize,
            posting
                .company_employee_count
                .map_or(true, |count| count > self.min_company_size),
        );
        checks.insert(Check::PermanentPosition, !self.temporary.found_in(&text));
        checks.insert(Check::Mlops, self.mlops.found_in(&text));

        Ok(RuleVerdict::new(checks))
    }

    /// Full-time wording wins; with neither full- nor part-time wording the
    /// posting is assumed full-time.
    fn is_full_time(&self, text: &str) -> bool {
        let found_full_time = self.full_time.found_in(text);
        let found_part_time = self.part_time.found_in(text);
        found_full_time || !found_part_time
    }
}

fn is_english(text: &str) -> bool {
    whatlang::detect(text).is_some_and(|info| info.lang() == Lang::Eng)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_POSTING: &str = "We are hiring a Machine Learning Engineer to join our \
        established analytics team. This is a full-time, fully remote position. You will \
        deploy models to the cloud, maintain CI/CD pipelines and track experiments with \
        MLflow. Experience with Python and AWS is expected.";

    fn filter() -> RuleFilter {
        RuleFilter::new(&RuleThresholds::default()).unwrap()
    }

    #[test]
    fn test_good_posting_passes_every_check() {
        let posting = Posting::new(1, GOOD_POSTING).with_employee_count(5000);
        let verdict = filter().evaluate(&posting).unwrap();

        assert!(verdict.passed(), "failed: {:?}", verdict.failed_checks());
        assert_eq!(verdict.checks.len(), Check::RULES.len());
    }

    #[test]
    fn test_senior_startup_office_posting_fails() {
        let posting = Posting::new(
            2,
            "We are looking for a Senior Backend Engineer to join our fast growing startup. \
             This role is in-office only at our Berlin headquarters. You will design and \
             deploy services on AWS and work closely with the product team every day.",
        );
        let verdict = filter().evaluate(&posting).unwrap();

        assert_eq!(verdict.get(Check::JuniorMid), Some(false));
        assert_eq!(verdict.get(Check::CompanyEstablished), Some(false));
        assert_eq!(verdict.get(Check::Remote), Some(false));
        assert!(!verdict.passed());
    }

    #[test]
    fn test_missing_description() {
        let result = filter().evaluate(&Posting::without_description(3));
        assert!(matches!(result, Err(JobFilterError::MissingField(_))));

        let result = filter().evaluate(&Posting::new(4, "  "));
        assert!(matches!(result, Err(JobFilterError::MissingField(_))));
    }

    #[test]
    fn test_full_time_defaults_to_pass() {
        let filter = filter();
        assert!(filter.is_full_time("a regular role"));
        assert!(filter.is_full_time("no wording either way"));
        assert!(!filter.is_full_time("hourly freelance work"));
        assert!(filter.is_full_time("full-time or part-time"));
    }

    #[test]
    fn test_company_size_threshold() {
        let filter = filter();
        let base = Posting::new(5, GOOD_POSTING);

        let unknown = filter.evaluate(&base).unwrap();
        assert_eq!(unknown.get(Check::CompanySize), Some(true));

        let small = filter.evaluate(&base.clone().with_employee_count(100)).unwrap();
        assert_eq!(small.get(Check::CompanySize), Some(false));

        let large = filter.evaluate(&base.with_employee_count(101)).unwrap();
        assert_eq!(large.get(Check::CompanySize), Some(true));
    }

    #[test]
    fn test_keywords_match_case_insensitively() {
        let posting = Posting::new(
            6,
            "Remote platform engineer. You own our CI/CD tooling and keep the lights on.",
        );
        let verdict = filter().evaluate(&posting).unwrap();
        assert_eq!(verdict.get(Check::Mlops), Some(true));
    }

    #[test]
    fn test_internship_is_not_permanent() {
        let posting = Posting::new(7, "Remote internship in our cloud team");
        let verdict = filter().evaluate(&posting).unwrap();

        assert_eq!(verdict.get(Check::PermanentPosition), Some(false));
        assert_eq!(verdict.get(Check::FullTime), Some(false));
    }

    #[test]
    fn test_german_text_is_not_english() {
        let posting = Posting::new(
            8,
            "Wir suchen ab sofort einen Softwareentwickler in Vollzeit für unser Team in \
             München. Sie arbeiten an spannenden Projekten und entwickeln unsere Plattform \
             gemeinsam mit den Kollegen weiter.",
        );
        let verdict = filter().evaluate(&posting).unwrap();
        assert_eq!(verdict.get(Check::EnglishText), Some(false));
    }

    #[test]
    fn test_evaluation_is_pure() {
        let filter = filter();
        let posting = Posting::new(9, GOOD_POSTING).with_employee_count(300);
        let first = filter.evaluate(&posting).unwrap();
        for _ in 0..3 {
            assert_eq!(filter.evaluate(&posting).unwrap(), first);
        }
    }
}
