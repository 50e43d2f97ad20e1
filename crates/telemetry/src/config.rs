//! Telemetry configuration.
//!
//! | Variable | Effect | Default |
//! |----------|--------|---------|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | Enables OTLP trace + metric export | unset |
//! | `OTEL_INMEMORY_EXPORTER` | Captures spans and metrics in memory | `false` |
//! | `OTEL_LOG_LLM_CONTENT` | Records prompt/completion text on LLM spans | `false` |
//! | `OTEL_LLM_CONTENT_MAX_LENGTH` | Characters kept per recorded text | `1000` |
//! | `SERVICE_NAME` | `service.name` resource attribute | `quartet` |
//! | `SERVICE_VERSION` | `service.version` resource attribute | crate version |
//! | `DEPLOYMENT_ENV` | `deployment.environment` resource attribute | `local` |
//! | `RUST_LOG` | Log filter directive | `info` |

use pipeline::config::{flag, non_empty, number};
use pipeline::ConfigError;

pub const DEFAULT_SERVICE_NAME: &str = "quartet";
pub const DEFAULT_DEPLOYMENT_ENV: &str = "local";
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 1000;
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Settings for the [`crate::Telemetry`] context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub deployment_environment: String,
    /// OTLP collector endpoint; `None` disables OTLP export.
    pub otlp_endpoint: Option<String>,
    /// Capture finished spans and metric updates in memory.
    pub in_memory_exporter: bool,
    /// Default for [`crate::ScopedSpan::log_content`] when no explicit choice is made.
    pub log_content: bool,
    /// Maximum characters kept for each recorded prompt or completion.
    pub max_content_length: usize,
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            deployment_environment: DEFAULT_DEPLOYMENT_ENV.to_string(),
            otlp_endpoint: None,
            in_memory_exporter: false,
            log_content: false,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            service_name: non_empty(&lookup, "SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: non_empty(&lookup, "SERVICE_VERSION")
                .unwrap_or(defaults.service_version),
            deployment_environment: non_empty(&lookup, "DEPLOYMENT_ENV")
                .unwrap_or(defaults.deployment_environment),
            otlp_endpoint: non_empty(&lookup, "OTEL_EXPORTER_OTLP_ENDPOINT"),
            in_memory_exporter: flag(&lookup, "OTEL_INMEMORY_EXPORTER", false),
            log_content: flag(&lookup, "OTEL_LOG_LLM_CONTENT", false),
            max_content_length: number(
                &lookup,
                "OTEL_LLM_CONTENT_MAX_LENGTH",
                defaults.max_content_length,
            )?,
            log_filter: non_empty(&lookup, "RUST_LOG").unwrap_or(defaults.log_filter),
        })
    }

    /// Enables the in-memory span exporter and metrics recorder.
    pub fn with_in_memory_exporter(mut self) -> Self {
        self.in_memory_exporter = true;
        self
    }

    /// Sets the default for prompt/completion content logging.
    pub fn with_content_logging(mut self, enabled: bool, max_length: usize) -> Self {
        self.log_content = enabled;
        self.max_content_length = max_length;
        self
    }
}
