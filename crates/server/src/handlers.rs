//! Route handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pipeline::PipelineError;
use tracing::error;

use crate::types::{ErrorResponse, HealthResponse, RunRequest, RunResponse};
use crate::AppState;

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// `POST /run`: runs the pipeline once for the submitted task.
pub async fn run_handler(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, RunError> {
    let result = state.executor.run(&request.task).await?;
    Ok(Json(RunResponse::from_state(&result)))
}

/// A pipeline failure, reported as a 500 with an `error` body.
#[derive(Debug)]
pub struct RunError(PipelineError);

impl From<PipelineError> for RunError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for RunError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Pipeline run failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
