//! Named checks and the verdicts built from them

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    JuniorMid,
    EnglishText,
    CompanyEstablished,
    FullTime,
    Remote,
    CompanySize,
    PermanentPosition,
    Mlops,
    Match,
}

impl Check {
    /// Checks evaluated by the rule filter.
    pub const RULES: [Check; 8] = [
        Check::JuniorMid,
        Check::EnglishText,
        Check::CompanyEstablished,
        Check::FullTime,
        Check::Remote,
        Check::CompanySize,
        Check::PermanentPosition,
        Check::Mlops,
    ];

    /// Checks the language model is asked to answer.
    pub const ATTRIBUTES: [Check; 8] = [
        Check::JuniorMid,
        Check::EnglishText,
        Check::CompanyEstablished,
        Check::FullTime,
        Check::Remote,
        Check::CompanySize,
        Check::PermanentPosition,
        Check::Match,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Check::JuniorMid => "junior_mid",
            Check::EnglishText => "english_text",
            Check::CompanyEstablished => "company_established",
            Check::FullTime => "full_time",
            Check::Remote => "remote",
            Check::CompanySize => "company_size",
            Check::PermanentPosition => "permanent_position",
            Check::Mlops => "mlops",
            Check::Match => "match",
        }
    }

    /// Resolve a reply key, accepting the misspelling older prompts used.
    pub fn from_name(name: &str) -> Option<Check> {
        match name {
            "permament_position" => Some(Check::PermanentPosition),
            other => Check::RULES
                .iter()
                .chain(std::iter::once(&Check::Match))
                .copied()
                .find(|check| check.name() == other),
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value in {true, false, unknown}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tri {
    True,
    False,
    Unknown,
}

impl Tri {
    pub fn is_true(self) -> bool {
        self == Tri::True
    }
}

impl From<bool> for Tri {
    fn from(value: bool) -> Self {
        if value {
            Tri::True
        } else {
            Tri::False
        }
    }
}

impl From<Option<bool>> for Tri {
    fn from(value: Option<bool>) -> Self {
        value.map(Tri::from).unwrap_or(Tri::Unknown)
    }
}

/// Outcome of the deterministic rule checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleVerdict {
    pub checks: BTreeMap<Check, bool>,
}

impl RuleVerdict {
    pub fn new(checks: BTreeMap<Check, bool>) -> Self {
        Self { checks }
    }

    pub fn passed(&self) -> bool {
        self.checks.values().all(|&ok| ok)
    }

    pub fn get(&self, check: Check) -> Option<bool> {
        self.checks.get(&check).copied()
    }

    pub fn failed_checks(&self) -> Vec<Check> {
        self.checks
            .iter()
            .filter(|(_, &ok)| !ok)
            .map(|(check, _)| *check)
            .collect()
    }
}

/// Why an attribute verdict was degraded to all-unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeFailure {
    UnparsableResponse,
    TransportTimeout,
    Transport(String),
}

/// Outcome of the language model checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeVerdict {
    pub checks: BTreeMap<Check, Tri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<JudgeFailure>,
}

impl AttributeVerdict {
    /// Every attribute check set to `Unknown`.
    pub fn unknown() -> Self {
        Self {
            checks: Check::ATTRIBUTES.iter().map(|&c| (c, Tri::Unknown)).collect(),
            failure: None,
        }
    }

    pub fn degraded(failure: JudgeFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::unknown()
        }
    }

    /// Build a verdict covering every attribute check; absent entries are unknown.
    pub fn from_entries(entries: impl IntoIterator<Item = (Check, Tri)>) -> Self {
        let mut verdict = Self::unknown();
        for (check, value) in entries {
            if verdict.checks.contains_key(&check) {
                verdict.checks.insert(check, value);
            }
        }
        verdict
    }

    pub fn passed(&self) -> bool {
        self.checks.values().all(|value| value.is_true())
    }

    pub fn get(&self, check: Check) -> Tri {
        self.checks.get(&check).copied().unwrap_or(Tri::Unknown)
    }

    pub fn is_all_unknown(&self) -> bool {
        self.checks.values().all(|&value| value == Tri::Unknown)
    }
}
