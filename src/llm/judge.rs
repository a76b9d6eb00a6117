//! Language model judgment of posting attributes

use crate::error::{JobFilterError, Result};
use crate::llm::client::{CompletionOptions, LanguageModelClient};
use crate::llm::prompts::{PromptTemplates, SYSTEM_PROMPT};
use crate::processing::posting::Profile;
use crate::processing::verdict::{AttributeVerdict, Check, JudgeFailure, Tri};
use log::{debug, warn};
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgeOptions {
    pub completion: CompletionOptions,
    /// Deadline for a single model call.
    pub timeout: Duration,
}

impl Default for JudgeOptions {
    fn default() -> Self {
        Self {
            completion: CompletionOptions::default(),
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct AttributeJudge {
    client: Arc<dyn LanguageModelClient>,
    prompts: PromptTemplates,
    options: JudgeOptions,
    object_regex: Regex,
    literal_regex: Regex,
}

impl AttributeJudge {
    pub fn new(client: Arc<dyn LanguageModelClient>, options: JudgeOptions) -> Self {
        Self {
            client,
            prompts: PromptTemplates::default(),
            options,
            object_regex: Regex::new(r"(\{.*?\})").expect("Invalid object regex"),
            literal_regex: Regex::new(r"(?i)\b(true|false|null|none)\b")
                .expect("Invalid literal regex"),
        }
    }

    /// Ask the model about one posting. Never fails: timeouts, transport
    /// errors and unreadable replies all produce an all-unknown verdict.
    pub async fn judge(&self, profile: &Profile, posting_text: &str) -> AttributeVerdict {
        match self.request(profile, posting_text).await {
            Ok(reply) => match self.parse_reply(&reply) {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!("Discarding model reply: {}", e);
                    debug!("Raw reply: {}", reply);
                    AttributeVerdict::degraded(JudgeFailure::UnparsableResponse)
                }
            },
            Err(JobFilterError::TransportTimeout(after)) => {
                warn!("Model call timed out after {:?}", after);
                AttributeVerdict::degraded(JudgeFailure::TransportTimeout)
            }
            Err(e) => {
                warn!("Model call failed: {}", e);
                AttributeVerdict::degraded(JudgeFailure::Transport(e.to_string()))
            }
        }
    }

    async fn request(&self, profile: &Profile, posting_text: &str) -> Result<String> {
        let prompt = self
            .prompts
            .render_posting_match(&profile.raw_text, posting_text);

        let reply = tokio::time::timeout(
            self.options.timeout,
            self.client
                .complete(SYSTEM_PROMPT, &prompt, &self.options.completion),
        )
        .await
        .map_err(|_| JobFilterError::TransportTimeout(self.options.timeout))??;

        Ok(reply)
    }

    /// Pull the first `{...}` out of a reply and read it as check verdicts.
    pub fn parse_reply(&self, reply: &str) -> Result<AttributeVerdict> {
        let flattened = reply.replace(['\n', '\r'], "");
        let normalized = self
            .literal_regex
            .replace_all(&flattened, |caps: &regex::Captures| {
                match caps[1].to_ascii_lowercase().as_str() {
                    "none" => "null".to_string(),
                    other => other.to_string(),
                }
            });

        let object_text = self
            .object_regex
            .captures(&normalized)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| JobFilterError::UnparsableResponse("no JSON object in reply".to_string()))?;

        let object: serde_json::Map<String, Value> = serde_json::from_str(object_text)
            .map_err(|e| JobFilterError::UnparsableResponse(e.to_string()))?;

        let entries = object.iter().filter_map(|(key, value)| {
            let check = Check::from_name(key.trim())?;
            Some((check, Tri::from(value.as_bool())))
        });

        Ok(AttributeVerdict::from_entries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockClient;

    const ALL_TRUE: &str = r#"{"junior_mid":true,"english_text":true,"company_established":true,"full_time":true,"remote":true,"company_size":true,"permament_position":true,"match":true}"#;

    fn judge_with(client: MockClient) -> AttributeJudge {
        AttributeJudge::new(Arc::new(client), JudgeOptions::default())
    }

    fn parser() -> AttributeJudge {
        judge_with(MockClient::new(""))
    }

    #[test]
    fn test_all_true_reply_passes() {
        let verdict = parser().parse_reply(ALL_TRUE).unwrap();
        assert!(verdict.passed());
        assert_eq!(verdict.get(Check::PermanentPosition), Tri::True);
    }

    #[test]
    fn test_reply_wrapped_in_prose_and_newlines() {
        let reply = "Sure! Here is the result:\n{\n  \"junior_mid\": true,\n  \"remote\": false,\n  \"match\": null\n}\nLet me know.";
        let verdict = parser().parse_reply(reply).unwrap();

        assert_eq!(verdict.get(Check::JuniorMid), Tri::True);
        assert_eq!(verdict.get(Check::Remote), Tri::False);
        assert_eq!(verdict.get(Check::Match), Tri::Unknown);
        assert_eq!(verdict.get(Check::FullTime), Tri::Unknown);
        assert!(!verdict.passed());
    }

    #[test]
    fn test_python_style_literals_are_normalized() {
        let reply = r#"{"junior_mid": True, "english_text": FALSE, "remote": None, "match": Null}"#;
        let verdict = parser().parse_reply(reply).unwrap();

        assert_eq!(verdict.get(Check::JuniorMid), Tri::True);
        assert_eq!(verdict.get(Check::EnglishText), Tri::False);
        assert_eq!(verdict.get(Check::Remote), Tri::Unknown);
        assert_eq!(verdict.get(Check::Match), Tri::Unknown);
    }

    #[test]
    fn test_non_boolean_values_are_unknown() {
        let reply = r#"{"junior_mid": "yes", "remote": 1, "match": true, "salary": true}"#;
        let verdict = parser().parse_reply(reply).unwrap();

        assert_eq!(verdict.get(Check::JuniorMid), Tri::Unknown);
        assert_eq!(verdict.get(Check::Remote), Tri::Unknown);
        assert_eq!(verdict.get(Check::Match), Tri::True);
        assert_eq!(verdict.checks.len(), Check::ATTRIBUTES.len());
    }

    #[test]
    fn test_unparsable_replies() {
        let judge = parser();
        assert!(judge.parse_reply("I cannot answer that").is_err());
        assert!(judge.parse_reply(r#"{"junior_mid": true, "remote": tr"#).is_err());
        assert!(judge.parse_reply(r#"{"junior_mid": tru}"#).is_err());
    }

    #[test]
    fn test_empty_object_is_rejected() {
        let verdict = parser().parse_reply("{}").unwrap();
        assert!(verdict.is_all_unknown());
        assert!(!verdict.passed());
    }

    #[tokio::test]
    async fn test_judge_issues_one_request_with_posting_verbatim() {
        let client = Arc::new(MockClient::new(ALL_TRUE));
        let judge = AttributeJudge::new(client.clone(), JudgeOptions::default());
        let profile = Profile::new("Python developer CV");

        let verdict = judge.judge(&profile, "DESCRIPTION\nPosting XYZ-42").await;

        assert!(verdict.passed());
        assert_eq!(client.call_count(), 1);
        let prompt = &client.calls()[0];
        assert!(prompt.contains("DESCRIPTION\nPosting XYZ-42"));
        assert!(prompt.contains("Python developer CV"));
    }

    #[tokio::test]
    async fn test_truncated_json_degrades_to_unknown() {
        let judge = judge_with(MockClient::new(r#"{"junior_mid": true, "english_te"#));
        let verdict = judge.judge(&Profile::new("cv"), "posting").await;

        assert!(verdict.is_all_unknown());
        assert!(!verdict.passed());
        assert_eq!(verdict.failure, Some(JudgeFailure::UnparsableResponse));
    }

    #[tokio::test]
    async fn test_transport_failure_degrades_to_unknown() {
        let judge = judge_with(MockClient::failing("connection refused"));
        let verdict = judge.judge(&Profile::new("cv"), "posting").await;

        assert!(verdict.is_all_unknown());
        assert!(matches!(verdict.failure, Some(JudgeFailure::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_degrades_to_unknown() {
        let client = MockClient::new(ALL_TRUE).with_delay(Duration::from_secs(30));
        let options = JudgeOptions {
            timeout: Duration::from_secs(5),
            ..JudgeOptions::default()
        };
        let judge = AttributeJudge::new(Arc::new(client), options);

        let verdict = judge.judge(&Profile::new("cv"), "posting").await;

        assert!(verdict.is_all_unknown());
        assert_eq!(verdict.failure, Some(JudgeFailure::TransportTimeout));
    }
}
