//! Language model client seam and the Ollama chat transport

use crate::error::{JobFilterError, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const MAX_RETRIES: u32 = 3;

/// Per-request generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 200,
            temperature: 0.5,
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response body: {0}")]
    Decode(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl From<LlmError> for JobFilterError {
    fn from(err: LlmError) -> Self {
        JobFilterError::LanguageModel(err.to_string())
    }
}

/// Anything that turns a system and user prompt into a text reply.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> std::result::Result<String, LlmError>;

    /// Model identifier for reports.
    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// Client for an Ollama server's `/api/chat` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| JobFilterError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl LanguageModelClient for OllamaClient {
    /// Retries transport failures and 5xx responses with exponential backoff.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> std::result::Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            stream: false,
            options: ChatOptions {
                num_predict: options.max_output_tokens,
                temperature: options.temperature,
            },
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(self.chat_url())
                .json(&request_body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM server returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OllamaError>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            let parsed: ChatResponse =
                serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;
            let content = parsed
                .message
                .map(|m| m.content)
                .filter(|c| !c.trim().is_empty())
                .ok_or(LlmError::EmptyContent)?;

            debug!("LLM call succeeded: {} chars", content.len());
            return Ok(content);
        }

        Err(last_error.unwrap_or(LlmError::EmptyContent))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "llama3.2",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            stream: false,
            options: ChatOptions {
                num_predict: 200,
                temperature: 0.5,
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 200);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"model":"llama3.2","message":{"role":"assistant","content":"{\"match\": true}"},"done":true}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message.unwrap().content, "{\"match\": true}");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client =
            OllamaClient::new("http://localhost:11434/", "llama3.2", Duration::from_secs(5)).unwrap();
        assert_eq!(client.chat_url(), "http://localhost:11434/api/chat");
        assert_eq!(client.model_name(), "llama3.2");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        // port 9 (discard) is almost never served over HTTP
        let client =
            OllamaClient::new("http://127.0.0.1:9", "llama3.2", Duration::from_millis(200)).unwrap();
        let result = client
            .complete("system", "user", &CompletionOptions::default())
            .await;
        assert!(result.is_err());
    }
}
