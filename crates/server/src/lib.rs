//! Quartet HTTP API.
//!
//! ## Endpoints
//!
//! - `POST /run` with `{"task": "..."}`: runs the pipeline and returns
//!   `{"task", "plan", "work", "review"}`
//! - `GET /health`: returns `{"status": "ok"}`
//!
//! Every request is wrapped in a `tower-http` trace span, so the stage spans
//! of a run are nested under the HTTP request that triggered it.

mod handlers;
mod types;

pub use handlers::{health_handler, run_handler, RunError};
pub use types::{ErrorResponse, HealthResponse, RunRequest, RunResponse};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use nodes::PipelineExecutor;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<PipelineExecutor>,
}

impl AppState {
    pub fn new(executor: Arc<PipelineExecutor>) -> Self {
        Self { executor }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/run", post(handlers::run_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "Quartet HTTP server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
