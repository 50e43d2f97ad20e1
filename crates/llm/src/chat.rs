//! OpenAI-compatible chat-completions transport.
//!
//! Both providers speak the same wire format and differ only in URL and
//! authentication header. [`ChatClient`] sends one request, maps HTTP and
//! transport failures onto [`LlmError`], and converts the body into a
//! [`CompletionResponse`]. It never retries.

use std::time::Duration;

use pipeline::{CompletionResponse, LlmError, TokenCount, TokenUsage};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatRequest<'a> {
    /// A single user message.
    pub fn user(model: Option<&'a str>, prompt: &'a str, max_tokens: u32) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

impl ChatResponse {
    fn into_completion(self, provider: &str) -> Result<CompletionResponse, LlmError> {
        let choice = self.choices.into_iter().next().ok_or_else(|| {
            LlmError::MalformedResponse(format!("{provider} response contained no choices"))
        })?;
        let usage = self
            .usage
            .map(|u| TokenUsage {
                input: u.prompt_tokens.map(TokenCount::new),
                output: u.completion_tokens.map(TokenCount::new),
            })
            .unwrap_or_default();
        Ok(CompletionResponse {
            text: choice.message.content.unwrap_or_default(),
            usage,
            finish_reason: choice.finish_reason,
            model: self.model,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authentication header style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth<'a> {
    Bearer(&'a str),
    ApiKeyHeader(&'a str),
}

#[derive(Debug, Clone)]
pub(crate) struct ChatClient {
    http: Client,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(timeout: Duration) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, timeout })
    }

    /// Posts `body` to `url` and returns the first choice.
    pub async fn complete(
        &self,
        url: &str,
        auth: Auth<'_>,
        body: &ChatRequest<'_>,
        provider: &str,
    ) -> Result<CompletionResponse, LlmError> {
        let request = self.http.post(url).json(body);
        let request = match auth {
            Auth::Bearer(key) => request.bearer_auth(key),
            Auth::ApiKeyHeader(key) => request.header("api-key", key),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    duration: self.timeout,
                }
            } else {
                LlmError::Transport(format!("{provider} request failed: {e}"))
            }
        })?;

        let status = response.status();
        debug!(provider, status = status.as_u16(), "Received chat completion response");
        if !status.is_success() {
            return Err(map_status(status, provider));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    duration: self.timeout,
                }
            } else {
                LlmError::MalformedResponse(format!("Failed to parse {provider} response: {e}"))
            }
        })?;
        body.into_completion(provider)
    }
}

/// Maps an unsuccessful HTTP status onto the provider error taxonomy.
fn map_status(status: StatusCode, provider: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::ProviderAuth(format!("{provider} rejected the credentials: {status}"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            LlmError::ProviderQuota(format!("{provider} rate limit exceeded: {status}"))
        }
        s if s.is_server_error() => {
            LlmError::ProviderOutage(format!("{provider} server error: {status}"))
        }
        _ => LlmError::Transport(format!("{provider} returned {status}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "p"),
            LlmError::ProviderAuth(_)
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, "p"),
            LlmError::ProviderAuth(_)
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, "p"),
            LlmError::ProviderQuota(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, "p"),
            LlmError::ProviderOutage(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, "p"),
            LlmError::Transport(_)
        ));
    }

    #[test]
    fn request_serialises_as_single_user_message() {
        let request = ChatRequest::user(Some("gpt-4o-mini"), "hello", 256);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hello"}],
                "max_tokens": 256
            })
        );

        let without_model = serde_json::to_value(ChatRequest::user(None, "x", 1)).unwrap();
        assert!(without_model.get("model").is_none());
    }

    #[test]
    fn response_conversion_reads_first_choice_and_usage() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [
                {"message": {"role": "assistant", "content": "first"}, "finish_reason": "stop"},
                {"message": {"role": "assistant", "content": "second"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        }))
        .unwrap();

        let completion = body.into_completion("p").unwrap();
        assert_eq!(completion.text, "first");
        assert_eq!(completion.usage, TokenUsage::new(12, 5));
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
        assert_eq!(completion.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    }

    #[test]
    fn null_content_becomes_empty_text() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "length"}]
        }))
        .unwrap();

        let completion = body.into_completion("p").unwrap();
        assert_eq!(completion.text, "");
        assert_eq!(completion.usage, TokenUsage::default());
        assert!(completion.model.is_none());
    }

    #[test]
    fn missing_choices_is_malformed() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(
            body.into_completion("p"),
            Err(LlmError::MalformedResponse(_))
        ));
    }
}
