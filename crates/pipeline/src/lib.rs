//! Core domain for Quartet.
//!
//! This crate contains the state mapping threaded through the four-stage
//! pipeline, newtype identifiers, token value types, the error taxonomy, and
//! the [`LlmProvider`] port. Infrastructure crates implement the port; they
//! never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`StageName`, `ModelName`, `PipelineRunId`, ...) |
//! | [`types`] | Value types (`TokenCount`, `TokenUsage`, `Timestamp`) |
//! | [`state`] | `StateKey` and `PipelineState` |
//! | [`provider`] | `LlmProvider` port and its request/response types |
//! | [`errors`] | `PipelineError` and `LlmError` |
//! | [`config`] | Lookup-based parsing helpers and `ConfigError` |

pub mod config;
pub mod errors;
pub mod identifiers;
pub mod provider;
pub mod state;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::ConfigError;
pub use errors::{LlmError, PipelineError};
pub use identifiers::{ModelName, OperationName, PipelineRunId, StageName};
pub use provider::{CompletionRequest, CompletionResponse, LlmProvider, ProviderInfo};
pub use state::{PipelineState, StateKey};
pub use types::{Timestamp, TokenCount, TokenDirection, TokenUsage};
