//! Error types for the Quartet pipeline domain.
//!
//! Two families are defined here because they are handled differently by the
//! orchestration layer:
//!
//! - [`PipelineError`]: a stage body failed. Recorded on the stage span and
//!   propagated to the caller; the current request fails.
//! - [`LlmError`]: the completion provider failed. Never propagated past the
//!   LLM gateway; converted into fallback text that flows downstream.

use std::time::Duration;

use thiserror::Error;

use crate::StateKey;

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors raised by a pipeline stage.
///
/// These are fatal to the current request. There is no retry policy; the
/// stage span records the error and the executor stops at the failing stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A stage tried to read a key that no upstream stage (or the initial
    /// input) has written.
    #[error("Stage '{stage}' requires state key '{key}' which has not been written")]
    MissingStateKey {
        /// Identifier of the stage that performed the read.
        stage: String,
        /// The key that was absent.
        key: StateKey,
    },

    /// A stage tried to write a key that already holds a value.
    ///
    /// State grows monotonically; each key is owned by exactly one stage.
    #[error("State key '{key}' has already been written")]
    StateKeyOverwrite {
        /// The key that was already present.
        key: StateKey,
    },

    /// A stage failed for a reason specific to its own body.
    #[error("Stage '{stage}' failed: {reason}")]
    StageFailed {
        /// Identifier of the failing stage.
        stage: String,
        /// Human-readable description of the failure.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// Failures of a single completion call.
///
/// Produced by [`crate::LlmProvider`] implementations. The LLM gateway turns
/// every variant into fallback text, so none of these abort a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// Network or protocol failure talking to the provider.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider rejected the credentials (401, 403).
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// The provider throttled the call (429).
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// The provider returned a server error (5xx).
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// The transport timed out before the provider answered.
    #[error("Timeout after {duration:?}")]
    Timeout {
        /// The timeout that elapsed.
        duration: Duration,
    },

    /// The response body could not be interpreted as a completion.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The provider client could not be constructed from its settings.
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_message_names_stage_and_key() {
        let err = PipelineError::MissingStateKey {
            stage: "worker.agent".to_string(),
            key: StateKey::Plan,
        };
        assert_eq!(
            err.to_string(),
            "Stage 'worker.agent' requires state key 'plan' which has not been written"
        );
    }

    #[test]
    fn timeout_message_includes_duration() {
        let err = LlmError::Timeout {
            duration: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "Timeout after 5s");
    }
}
