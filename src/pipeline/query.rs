//! Derive the ranking query from a profile

use crate::config::{QueryConfig, QueryStrategyKind};
use crate::llm::client::{CompletionOptions, LanguageModelClient};
use crate::llm::prompts::{PromptTemplates, SYSTEM_PROMPT};
use crate::processing::posting::Profile;
use crate::processing::text_normalizer::TextNormalizer;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryStrategy {
    /// Most frequent profile keywords.
    Keywords { max_terms: usize },
    /// Ask the model for a short search query; falls back to keywords.
    Llm { max_terms: usize },
    /// Use the given text as is.
    Fixed(String),
}

impl Default for QueryStrategy {
    fn default() -> Self {
        QueryStrategy::Keywords { max_terms: 10 }
    }
}

impl From<&QueryConfig> for QueryStrategy {
    fn from(config: &QueryConfig) -> Self {
        match (config.strategy, &config.fixed) {
            (QueryStrategyKind::Fixed, Some(text)) => QueryStrategy::Fixed(text.clone()),
            (QueryStrategyKind::Llm, _) => QueryStrategy::Llm {
                max_terms: config.max_terms,
            },
            _ => QueryStrategy::Keywords {
                max_terms: config.max_terms,
            },
        }
    }
}

pub struct QueryBuilder {
    strategy: QueryStrategy,
    client: Arc<dyn LanguageModelClient>,
    normalizer: TextNormalizer,
    prompts: PromptTemplates,
    completion: CompletionOptions,
    timeout: Duration,
}

impl QueryBuilder {
    pub fn new(
        strategy: QueryStrategy,
        client: Arc<dyn LanguageModelClient>,
        completion: CompletionOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            strategy,
            client,
            normalizer: TextNormalizer::new(),
            prompts: PromptTemplates::default(),
            completion,
            timeout,
        }
    }

    pub async fn build(&self, profile: &Profile) -> String {
        let query = match &self.strategy {
            QueryStrategy::Fixed(text) => text.clone(),
            QueryStrategy::Keywords { max_terms } => self.keyword_query(profile, *max_terms),
            QueryStrategy::Llm { max_terms } => match self.llm_query(profile, *max_terms).await {
                Some(query) => query,
                None => self.keyword_query(profile, *max_terms),
            },
        };

        info!("Search query: {}", query);
        query
    }

    fn keyword_query(&self, profile: &Profile, max_terms: usize) -> String {
        self.normalizer
            .extract_keywords(&profile.raw_text, max_terms)
            .join(" ")
    }

    async fn llm_query(&self, profile: &Profile, max_terms: usize) -> Option<String> {
        let prompt = self.prompts.render_search_query(&profile.raw_text, max_terms);
        let reply = match tokio::time::timeout(
            self.timeout,
            self.client.complete(SYSTEM_PROMPT, &prompt, &self.completion),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Query generation failed, using keywords: {}", e);
                return None;
            }
            Err(_) => {
                warn!("Query generation timed out, using keywords");
                return None;
            }
        };

        clean_query(&reply)
    }
}

/// First non-empty line of a reply without surrounding quotes.
fn clean_query(reply: &str) -> Option<String> {
    reply
        .lines()
        .map(|line| line.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`').trim())
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
}
