//! Quartet pipeline stages, LLM gateway, and executor.
//!
//! This crate provides the four stage implementations (planner, worker,
//! reflection, reviewer), the [`LlmGateway`] that wraps every model call with
//! telemetry and error containment, and the [`PipelineExecutor`] that runs the
//! stages in order under instrumented spans.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Stages sequence calls between the domain types in
//! the [`pipeline`] crate and the provider port. They contain no transport
//! code of their own.

pub mod executor;
pub mod gateway;
pub mod stages;

pub use executor::PipelineExecutor;
pub use gateway::LlmGateway;
pub use stages::{PlannerAgent, ReflectionAgent, ReviewerAgent, Stage, WorkerAgent};
