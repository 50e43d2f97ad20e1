//! Provider selection from environment variables.
//!
//! | Variable | Effect | Default |
//! |----------|--------|---------|
//! | `AZURE_OPENAI_ENDPOINT` | Azure resource endpoint | unset |
//! | `AZURE_OPENAI_DEPLOYMENT` | Azure deployment name | unset |
//! | `AZURE_OPENAI_API_VERSION` | Azure API version | `2024-08-01-preview` |
//! | `AZURE_OPENAI_API_KEY` | Credential, first choice | unset |
//! | `OPENAI_API_KEY` | Credential, second choice | unset |
//! | `GITHUB_MODELS_API_KEY` | Credential, third choice | unset |
//! | `OPENAI_BASE_URL` / `GITHUB_MODELS_BASE_URL` | OpenAI-compatible base URL | OpenAI |
//! | `MODEL_NAME` | Model for the OpenAI-compatible provider | `openai/gpt-4o-mini` |
//! | `LLM_MAX_TOKENS` | Completion budget per call | `256` |
//! | `LLM_TIMEOUT_SECS` | Per-request timeout | `120` |
//!
//! Azure is selected when both its endpoint and deployment are set. With no
//! credential at all, no provider is built and callers use stub output.

use std::time::Duration;

use pipeline::config::{non_empty, number};
use pipeline::ConfigError;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";
pub const DEFAULT_MAX_TOKENS: u32 = 256;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Which hosted API to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    AzureOpenAi {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
    OpenAi {
        /// `None` means the public OpenAI API.
        base_url: Option<String>,
        model: String,
    },
}

/// Everything needed to construct a provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// `None` selects stub mode.
    pub api_key: Option<String>,
    pub kind: ProviderKind,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ProviderSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(&lookup, "AZURE_OPENAI_API_KEY")
            .or_else(|| non_empty(&lookup, "OPENAI_API_KEY"))
            .or_else(|| non_empty(&lookup, "GITHUB_MODELS_API_KEY"));

        let azure = non_empty(&lookup, "AZURE_OPENAI_ENDPOINT")
            .zip(non_empty(&lookup, "AZURE_OPENAI_DEPLOYMENT"));
        let kind = match azure {
            Some((endpoint, deployment)) => ProviderKind::AzureOpenAi {
                endpoint,
                deployment,
                api_version: non_empty(&lookup, "AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            },
            None => ProviderKind::OpenAi {
                base_url: non_empty(&lookup, "OPENAI_BASE_URL")
                    .or_else(|| non_empty(&lookup, "GITHUB_MODELS_BASE_URL")),
                model: non_empty(&lookup, "MODEL_NAME")
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
        };

        Ok(Self {
            api_key,
            kind,
            max_tokens: number(&lookup, "LLM_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            timeout: Duration::from_secs(number(
                &lookup,
                "LLM_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        })
    }

    /// Settings with no credential, i.e. stub mode.
    pub fn stub() -> Self {
        Self {
            api_key: None,
            kind: ProviderKind::OpenAi {
                base_url: None,
                model: DEFAULT_MODEL.to_string(),
            },
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// The API key is never printed.
impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("kind", &self.kind)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}
