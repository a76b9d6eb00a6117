//! Deterministic language model client for tests and offline runs

use crate::llm::client::{CompletionOptions, LanguageModelClient, LlmError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Simulated transport failure.
    Fail(String),
}

struct MockRule {
    needle: String,
    reply: MockReply,
    delay: Option<Duration>,
}

/// Replies chosen by the first rule whose needle occurs in the user prompt.
pub struct MockClient {
    rules: Vec<MockRule>,
    default_reply: MockReply,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default_reply: MockReply::Text(default_reply.into()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            default_reply: MockReply::Fail(message.into()),
            ..Self::new("")
        }
    }

    fn rule(mut self, needle: impl Into<String>, reply: MockReply, delay: Option<Duration>) -> Self {
        self.rules.push(MockRule {
            needle: needle.into(),
            reply,
            delay,
        });
        self
    }

    pub fn when(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rule(needle, MockReply::Text(reply.into()), None)
    }

    /// Like `when`, but the reply arrives after `delay`.
    pub fn when_delayed(self, needle: impl Into<String>, reply: impl Into<String>, delay: Duration) -> Self {
        self.rule(needle, MockReply::Text(reply.into()), Some(delay))
    }

    pub fn fail_when(self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rule(needle, MockReply::Fail(message.into()), None)
    }

    /// Delay replies that have no delay of their own.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// User prompts received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LanguageModelClient for MockClient {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(user_prompt.to_string());
        }

        let rule = self
            .rules
            .iter()
            .find(|rule| user_prompt.contains(rule.needle.as_str()));
        let reply = rule.map_or(&self.default_reply, |rule| &rule.reply);

        if let Some(delay) = rule.and_then(|rule| rule.delay).or(self.delay) {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Fail(message) => Err(LlmError::Api {
                status: 503,
                message: message.clone(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
