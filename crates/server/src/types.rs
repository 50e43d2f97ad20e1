//! Request and response bodies.

use pipeline::{PipelineState, StateKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub task: String,
}

/// The parts of a finished run returned to the caller. The reflection stays
/// internal to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResponse {
    pub task: String,
    pub plan: Option<String>,
    pub work: Option<String>,
    pub review: Option<String>,
}

impl RunResponse {
    pub fn from_state(state: &PipelineState) -> Self {
        let field = |key| state.get(key).map(str::to_string);
        Self {
            task: field(StateKey::Task).unwrap_or_default(),
            plan: field(StateKey::Plan),
            work: field(StateKey::Work),
            review: field(StateKey::Review),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
