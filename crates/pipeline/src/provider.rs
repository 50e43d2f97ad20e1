//! The completion-provider port.
//!
//! Stages never talk to a model API directly. They go through the LLM gateway,
//! which drives an implementation of [`LlmProvider`] supplied by the `llm`
//! infrastructure crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{LlmError, ModelName, TokenUsage};

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// One single-turn completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The full prompt, sent as a single user message.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Creates a request for `prompt` capped at `max_tokens`.
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// A completed model response.
///
/// Only `text` is guaranteed. Everything else is metadata that providers may
/// or may not report; consumers must treat absence as normal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text (empty if the provider returned no content).
    pub text: String,
    /// Token usage, if reported.
    pub usage: TokenUsage,
    /// Why generation stopped (e.g. `"stop"`, `"length"`), if reported.
    pub finish_reason: Option<String>,
    /// The model that actually served the call, if reported.
    pub model: Option<String>,
}

impl CompletionResponse {
    /// Creates a response carrying only text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Provider description
// ---------------------------------------------------------------------------

/// Static description of a configured provider, used to label LLM spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    /// Provider family (`"openai"`, `"azure_openai"`).
    pub system: &'static str,
    /// Model or deployment the provider sends requests to.
    pub model: ModelName,
    /// Extra provider-specific span attributes (endpoint, API version, ...).
    pub attributes: Vec<(&'static str, String)>,
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// A hosted completion API.
///
/// Implementations perform exactly one outbound call per [`complete`] and do
/// not retry.
///
/// [`complete`]: LlmProvider::complete
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Describes the provider for span attributes and metric labels.
    fn info(&self) -> &ProviderInfo;

    /// Sends `request` and returns the provider's completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
