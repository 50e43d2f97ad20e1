//! [`LlmProvider`] implementations for OpenAI-compatible APIs and Azure OpenAI.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{CompletionRequest, CompletionResponse, LlmError, LlmProvider, ModelName, ProviderInfo};
use tracing::debug;

use crate::chat::{Auth, ChatClient, ChatRequest};

/// Public OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub const OPENAI_SYSTEM: &str = "openai";
pub const AZURE_OPENAI_SYSTEM: &str = "azure_openai";

/// Span attribute carrying a custom OpenAI-compatible base URL.
pub const ATTR_BASE_URL: &str = "llm.base_url";
pub const ATTR_AZURE_ENDPOINT: &str = "llm.azure.endpoint";
pub const ATTR_AZURE_API_VERSION: &str = "llm.azure.api_version";

fn model_name(value: &str) -> Result<ModelName, LlmError> {
    ModelName::new(value)
        .ok_or_else(|| LlmError::Misconfiguration("Model or deployment name is empty".to_string()))
}

// ---------------------------------------------------------------------------
// OpenAI and compatible (GitHub Models, proxies)
// ---------------------------------------------------------------------------

/// Talks to `{base_url}/chat/completions` with bearer authentication.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: ChatClient,
    url: String,
    api_key: String,
    info: ProviderInfo,
}

impl OpenAiProvider {
    /// `base_url` of `None` targets the public OpenAI API.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let mut attributes = Vec::new();
        if let Some(base) = &base_url {
            attributes.push((ATTR_BASE_URL, base.clone()));
        }
        let base = base_url.unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());

        Ok(Self {
            client: ChatClient::new(timeout)?,
            url: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key: api_key.into(),
            info: ProviderInfo {
                system: OPENAI_SYSTEM,
                model: model_name(model)?,
                attributes,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(
            provider = OPENAI_SYSTEM,
            model = %self.info.model,
            max_tokens = request.max_tokens,
            "Invoking chat completion"
        );
        let body = ChatRequest::user(
            Some(self.info.model.as_str()),
            &request.prompt,
            request.max_tokens,
        );
        self.client
            .complete(&self.url, Auth::Bearer(&self.api_key), &body, OPENAI_SYSTEM)
            .await
    }
}

// ---------------------------------------------------------------------------
// Azure OpenAI
// ---------------------------------------------------------------------------

/// Talks to an Azure OpenAI deployment with `api-key` header authentication.
///
/// The deployment selects the model, so the request body carries none.
#[derive(Debug, Clone)]
pub struct AzureOpenAiProvider {
    client: ChatClient,
    url: String,
    api_key: String,
    info: ProviderInfo,
}

impl AzureOpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: &str,
        deployment: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment,
            api_version
        );
        Ok(Self {
            client: ChatClient::new(timeout)?,
            url,
            api_key: api_key.into(),
            info: ProviderInfo {
                system: AZURE_OPENAI_SYSTEM,
                model: model_name(deployment)?,
                attributes: vec![
                    (ATTR_AZURE_ENDPOINT, endpoint.to_string()),
                    (ATTR_AZURE_API_VERSION, api_version.to_string()),
                ],
            },
        })
    }
}

#[async_trait]
impl LlmProvider for AzureOpenAiProvider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(
            provider = AZURE_OPENAI_SYSTEM,
            deployment = %self.info.model,
            max_tokens = request.max_tokens,
            "Invoking chat completion"
        );
        let body = ChatRequest::user(None, &request.prompt, request.max_tokens);
        self.client
            .complete(
                &self.url,
                Auth::ApiKeyHeader(&self.api_key),
                &body,
                AZURE_OPENAI_SYSTEM,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn openai_defaults_to_public_api() {
        let provider = OpenAiProvider::new("k", None, "gpt-4o-mini", TIMEOUT).unwrap();
        assert_eq!(provider.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(provider.info().system, "openai");
        assert_eq!(provider.info().model.as_str(), "gpt-4o-mini");
        assert!(provider.info().attributes.is_empty());
    }

    #[test]
    fn openai_custom_base_url_is_recorded() {
        let provider = OpenAiProvider::new(
            "k",
            Some("https://models.inference.ai.azure.com/".to_string()),
            "openai/gpt-4o-mini",
            TIMEOUT,
        )
        .unwrap();
        assert_eq!(
            provider.url,
            "https://models.inference.ai.azure.com/chat/completions"
        );
        assert_eq!(
            provider.info().attributes,
            vec![(ATTR_BASE_URL, "https://models.inference.ai.azure.com/".to_string())]
        );
    }

    #[test]
    fn azure_url_includes_deployment_and_version() {
        let provider = AzureOpenAiProvider::new(
            "k",
            "https://res.openai.azure.com/",
            "gpt4o",
            "2024-08-01-preview",
            TIMEOUT,
        )
        .unwrap();
        assert_eq!(
            provider.url,
            "https://res.openai.azure.com/openai/deployments/gpt4o/chat/completions?api-version=2024-08-01-preview"
        );
        assert_eq!(provider.info().system, "azure_openai");
        assert_eq!(provider.info().model.as_str(), "gpt4o");
        assert_eq!(provider.info().attributes.len(), 2);
    }

    #[test]
    fn empty_model_is_misconfiguration() {
        let err = OpenAiProvider::new("k", None, "", TIMEOUT).unwrap_err();
        assert!(matches!(err, LlmError::Misconfiguration(_)));
    }
}
