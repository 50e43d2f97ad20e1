//! Quartet LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::LlmProvider`] port for OpenAI-compatible APIs
//! (OpenAI itself, GitHub Models, proxies) and for Azure OpenAI deployments.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting, response parsing,
//! and error classification live here. The [`pipeline`] crate sees only
//! [`pipeline::LlmProvider`]. Telemetry for model calls is recorded by the
//! caller, not by the providers.
//!
//! ## Stub mode
//!
//! [`build_provider`] returns `None` when no credential is configured. Callers
//! then answer every prompt with [`stub_response`] and make no network call.

use std::sync::Arc;

use pipeline::{LlmError, LlmProvider};
use tracing::info;

mod chat;
pub mod providers;
pub mod settings;

pub use providers::{AzureOpenAiProvider, OpenAiProvider};
pub use settings::{ProviderKind, ProviderSettings};

/// Prefix of the text returned in stub mode.
pub const STUB_PREFIX: &str = "[stub-response]";

/// Prefix of the text returned in place of a failed completion.
pub const FALLBACK_PREFIX: &str = "[llm-error-fallback]";

const STUB_PROMPT_CHARS: usize = 80;

/// The stub answer: the prefix, the first 80 characters of `prompt`, and `...`.
pub fn stub_response(prompt: &str) -> String {
    let head: String = prompt.chars().take(STUB_PROMPT_CHARS).collect();
    format!("{STUB_PREFIX} {head}...")
}

/// The text substituted for a completion that failed with `error`.
pub fn fallback_response(error: &LlmError) -> String {
    format!("{FALLBACK_PREFIX} {error}")
}

/// Builds the provider `settings` describe, or `None` in stub mode.
///
/// # Errors
///
/// Returns `LlmError::Misconfiguration` if the HTTP client cannot be built or
/// the model name is empty.
pub fn build_provider(
    settings: &ProviderSettings,
) -> Result<Option<Arc<dyn LlmProvider>>, LlmError> {
    let Some(api_key) = settings.api_key.as_deref() else {
        info!("No LLM credential configured; using stub responses");
        return Ok(None);
    };

    let provider: Arc<dyn LlmProvider> = match &settings.kind {
        ProviderKind::AzureOpenAi {
            endpoint,
            deployment,
            api_version,
        } => Arc::new(AzureOpenAiProvider::new(
            api_key,
            endpoint,
            deployment,
            api_version,
            settings.timeout,
        )?),
        ProviderKind::OpenAi { base_url, model } => Arc::new(OpenAiProvider::new(
            api_key,
            base_url.clone(),
            model,
            settings.timeout,
        )?),
    };

    let info = provider.info();
    info!(system = info.system, model = %info.model, "LLM provider configured");
    Ok(Some(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_response_keeps_eighty_characters() {
        let prompt = "x".repeat(200);
        let stub = stub_response(&prompt);
        assert_eq!(stub, format!("[stub-response] {}...", "x".repeat(80)));
    }

    #[test]
    fn short_prompts_are_kept_whole() {
        assert_eq!(
            stub_response("Create a concise 2-step plan for: Demo task"),
            "[stub-response] Create a concise 2-step plan for: Demo task..."
        );
    }

    #[test]
    fn stub_counts_characters_not_bytes() {
        let prompt = "é".repeat(100);
        let stub = stub_response(&prompt);
        assert_eq!(stub.chars().filter(|c| *c == 'é').count(), 80);
    }

    #[test]
    fn fallback_carries_error_message() {
        let text = fallback_response(&LlmError::ProviderQuota("slow down".to_string()));
        assert_eq!(text, "[llm-error-fallback] Provider quota exceeded: slow down");
    }

    #[test]
    fn no_credential_builds_no_provider() {
        assert!(build_provider(&ProviderSettings::stub()).unwrap().is_none());
    }

    #[test]
    fn credential_selects_provider_family() {
        let mut settings = ProviderSettings::stub();
        settings.api_key = Some("k".to_string());
        let provider = build_provider(&settings).unwrap().unwrap();
        assert_eq!(provider.info().system, "openai");

        settings.kind = ProviderKind::AzureOpenAi {
            endpoint: "https://res.openai.azure.com".to_string(),
            deployment: "gpt4o".to_string(),
            api_version: "2024-08-01-preview".to_string(),
        };
        let provider = build_provider(&settings).unwrap().unwrap();
        assert_eq!(provider.info().system, "azure_openai");
    }
}
