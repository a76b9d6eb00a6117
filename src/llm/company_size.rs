//! Company size lookup used to enrich postings before matching

use crate::llm::client::{CompletionOptions, LanguageModelClient};
use crate::llm::prompts::{PromptTemplates, SYSTEM_PROMPT};
use crate::processing::posting::Posting;
use async_trait::async_trait;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Resolves a company name to its employee count. Failures are `None`.
#[async_trait]
pub trait CompanySizeResolver: Send + Sync {
    async fn resolve(&self, company: &str) -> Option<u64>;
}

/// Asks the language model for the head count and reads the first number.
pub struct LlmSizeResolver {
    client: Arc<dyn LanguageModelClient>,
    prompts: PromptTemplates,
    timeout: Duration,
    number_regex: Regex,
}

impl LlmSizeResolver {
    pub fn new(client: Arc<dyn LanguageModelClient>, timeout: Duration) -> Self {
        Self {
            client,
            prompts: PromptTemplates::default(),
            timeout,
            number_regex: Regex::new(r"\b\d{1,3}(?:[,.]\d{3})+\b|\d+").expect("Invalid number regex"),
        }
    }

    /// First number in the text. `,` and `.` count as thousands separators
    /// only between complete three-digit groups; otherwise the leading digits
    /// are read on their own.
    pub fn extract_first_number(&self, text: &str) -> Option<u64> {
        self.number_regex
            .find(text)
            .and_then(|m| m.as_str().replace([',', '.'], "").parse().ok())
    }
}

#[async_trait]
impl CompanySizeResolver for LlmSizeResolver {
    async fn resolve(&self, company: &str) -> Option<u64> {
        let prompt = self.prompts.render_company_size(company);
        let options = CompletionOptions {
            max_output_tokens: 100,
            temperature: 0.0,
        };

        let reply = match tokio::time::timeout(
            self.timeout,
            self.client.complete(SYSTEM_PROMPT, &prompt, &options),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Company size lookup failed for {}: {}", company, e);
                return None;
            }
            Err(_) => {
                warn!("Company size lookup timed out for {}", company);
                return None;
            }
        };

        let count = self.extract_first_number(&reply);
        debug!("{} employees: {:?}", company, count);
        count
    }
}

/// Fill in unknown employee counts, resolving each distinct company once.
/// Returns how many postings received a count.
pub async fn enrich_company_sizes(
    postings: &mut [Posting],
    resolver: &dyn CompanySizeResolver,
) -> usize {
    let companies: BTreeSet<String> = postings
        .iter()
        .filter(|p| p.company_employee_count.is_none() && !p.company.trim().is_empty())
        .map(|p| p.company.clone())
        .collect();

    info!("Resolving company size for {} companies", companies.len());

    let mut sizes: HashMap<String, Option<u64>> = HashMap::new();
    for company in companies {
        let size = resolver.resolve(&company).await;
        sizes.insert(company, size);
    }

    let mut enriched = 0;
    for posting in postings
        .iter_mut()
        .filter(|p| p.company_employee_count.is_none())
    {
        if let Some(Some(size)) = sizes.get(&posting.company) {
            posting.company_employee_count = Some(*size);
            enriched += 1;
        }
    }
    enriched
}
