//! Configuration management for the job filter

use crate::error::{JobFilterError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub rules: RuleThresholds,
    pub query: QueryConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Upper bound on judgments in flight at once.
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of ranked postings handed to the filters; absent means all.
    pub top_k: Option<usize>,
    pub k1: f32,
    pub b: f32,
}

/// Keyword lists and limits used by the rule filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleThresholds {
    pub min_company_size: u64,
    pub seniority_keywords: Vec<String>,
    pub startup_keywords: Vec<String>,
    pub full_time_keywords: Vec<String>,
    pub part_time_keywords: Vec<String>,
    pub remote_keywords: Vec<String>,
    pub temporary_keywords: Vec<String>,
    pub mlops_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub strategy: QueryStrategyKind,
    pub max_terms: usize,
    /// Query text used verbatim when the strategy is `fixed`.
    pub fixed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStrategyKind {
    Keywords,
    Llm,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Directory receiving one text file per accepted posting.
    pub directory: PathBuf,
    pub detailed: bool,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            min_company_size: 100,
            seniority_keywords: strings(&["senior"]),
            startup_keywords: strings(&["startup"]),
            full_time_keywords: strings(&["full-time", "full time", "permanent", "regular", "fulltime"]),
            part_time_keywords: strings(&[
                "part-time",
                "part time",
                "parttime",
                "freelance",
                "hourly",
                "internship",
            ]),
            remote_keywords: strings(&["remote", "home", "teleworking"]),
            temporary_keywords: strings(&["internship", "trainee", "fellowship"]),
            mlops_keywords: strings(&["mlops", "aws", "cloud", "mlflow", "ci/cd", "deploy"]),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            max_output_tokens: 200,
            temperature: 0.5,
            timeout_secs: 120,
            max_concurrency: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig {
                top_k: Some(10),
                k1: 1.5,
                b: 0.75,
            },
            rules: RuleThresholds::default(),
            query: QueryConfig {
                strategy: QueryStrategyKind::Keywords,
                max_terms: 10,
                fixed: None,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                directory: PathBuf::from("data").join("filtered_jobs"),
                detailed: false,
                color_output: true,
            },
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults on first use.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| JobFilterError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| JobFilterError::Configuration(format!("Failed to serialize config: {}", e)))
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("job-filter")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.max_concurrency == 0 {
            return Err(JobFilterError::Configuration(
                "llm.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(JobFilterError::Configuration(
                "llm.timeout_secs must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.b) || self.retrieval.k1 < 0.0 {
            return Err(JobFilterError::Configuration(format!(
                "invalid BM25 parameters: k1={} b={}",
                self.retrieval.k1, self.retrieval.b
            )));
        }
        if self.query.strategy == QueryStrategyKind::Fixed && self.query.fixed.is_none() {
            return Err(JobFilterError::Configuration(
                "query.strategy = \"fixed\" requires query.fixed".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed = Config::from_toml(&text).unwrap();

        assert_eq!(parsed.llm.model, "llama3.2");
        assert_eq!(parsed.retrieval.top_k, Some(10));
        assert_eq!(parsed.rules.min_company_size, 100);
        assert_eq!(parsed.query.strategy, QueryStrategyKind::Keywords);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.llm.max_concurrency = 4;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.llm.max_concurrency, 4);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.llm.max_concurrency = 0;
        let text = config.to_toml().unwrap();
        assert!(Config::from_toml(&text).is_err());
    }

    #[test]
    fn test_fixed_strategy_requires_text() {
        let mut config = Config::default();
        config.query.strategy = QueryStrategyKind::Fixed;
        assert!(config.validate().is_err());

        config.query.fixed = Some("data scientist remote".to_string());
        assert!(config.validate().is_ok());
    }
}
