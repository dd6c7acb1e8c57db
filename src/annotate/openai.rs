//! Completion service client for OpenAI-compatible chat endpoints
//!
//! Async HTTP via reqwest. Status codes are mapped onto [`ServiceError`]
//! so the scheduler can tell transient trouble from fatal misconfiguration.

use crate::annotate::{prompts, CompletionService, ServiceError, ServiceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat-completion client. One instance is shared by all scheduler workers;
/// reqwest pools connections internally.
pub struct OpenAiService {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiService {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ServiceError::MalformedRequest(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            max_tokens: 1024,
            temperature: 0.3,
        })
    }
}

#[async_trait]
impl CompletionService for OpenAiService {
    async fn submit(&self, prompt: &str, model: &str) -> ServiceResult<String> {
        let body = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompts::SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), message));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ServerError {
                status: status.as_u16(),
                message: format!("unparseable response body: {e}"),
            })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ServiceError::ServerError {
                status: status.as_u16(),
                message: "response contained no choices".to_string(),
            })?;

        debug!(model, chars = text.len(), "completion received");
        Ok(text)
    }
}

fn map_transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout
    } else {
        ServiceError::ServerError {
            status: 0,
            message: e.to_string(),
        }
    }
}

fn map_status(status: u16, message: String) -> ServiceError {
    match status {
        401 | 403 => ServiceError::AuthFailure(message),
        429 => ServiceError::RateLimited,
        400 | 422 => ServiceError::MalformedRequest(message),
        _ => ServiceError::ServerError { status, message },
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status(401, String::new()),
            ServiceError::AuthFailure(_)
        ));
        assert!(matches!(
            map_status(403, String::new()),
            ServiceError::AuthFailure(_)
        ));
        assert_eq!(map_status(429, String::new()), ServiceError::RateLimited);
        assert!(matches!(
            map_status(400, String::new()),
            ServiceError::MalformedRequest(_)
        ));
        assert!(matches!(
            map_status(503, String::new()),
            ServiceError::ServerError { status: 503, .. }
        ));
    }

    #[test]
    fn test_transient_statuses_are_retryable() {
        assert!(map_status(429, String::new()).is_transient());
        assert!(map_status(500, String::new()).is_transient());
        assert!(!map_status(401, String::new()).is_transient());
        assert!(!map_status(422, String::new()).is_transient());
    }
}
