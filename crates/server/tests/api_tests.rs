//! Integration tests for the HTTP API, served in-process with axum-test.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use nodes::{LlmGateway, PipelineExecutor, PlannerAgent, Stage};
use pipeline::{PipelineError, PipelineState, StageName};
use serde_json::json;
use server::{create_router, AppState, ErrorResponse, HealthResponse, RunResponse};
use telemetry::{Status, Telemetry};

fn stub_server() -> (TestServer, Arc<Telemetry>) {
    let telemetry = Arc::new(Telemetry::in_memory());
    let gateway = Arc::new(LlmGateway::stub(telemetry.clone()));
    let executor = Arc::new(PipelineExecutor::standard(gateway));
    let server = TestServer::new(create_router(AppState::new(executor))).unwrap();
    (server, telemetry)
}

#[tokio::test]
async fn health_reports_ok() {
    let (server, _) = stub_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn run_returns_task_plan_work_and_review() {
    let (server, _) = stub_server();

    let response = server
        .post("/run")
        .json(&json!({"task": "Demo task"}))
        .await;

    response.assert_status_ok();
    let body: RunResponse = response.json();
    assert_eq!(body.task, "Demo task");
    assert_eq!(
        body.plan.as_deref(),
        Some("[stub-response] Create a concise 2-step plan for: Demo task...")
    );
    assert!(body.work.is_some());
    assert!(body.review.is_some());

    let raw: serde_json::Value = response.json();
    assert!(raw.get("reflection").is_none());
}

#[tokio::test]
async fn run_fills_the_response_and_creates_one_span_per_stage() {
    let (server, telemetry) = stub_server();

    let response = server
        .post("/run")
        .json(&json!({"task": "Summarize observability benefits"}))
        .await;

    response.assert_status_ok();
    let body: RunResponse = response.json();
    for (field, value) in [("plan", &body.plan), ("work", &body.work), ("review", &body.review)] {
        assert!(
            value.as_deref().is_some_and(|text| !text.is_empty()),
            "{field} is empty"
        );
    }

    let names: Vec<String> = telemetry
        .finished_spans()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(
        names,
        [
            "planner.agent",
            "worker.agent",
            "reflection.agent",
            "reviewer.agent"
        ]
    );
}

#[tokio::test]
async fn missing_task_is_rejected() {
    let (server, telemetry) = stub_server();

    let response = server.post("/run").json(&json!({})).await;

    assert!(response.status_code().is_client_error());
    assert!(telemetry.finished_spans().is_empty());
}

struct Broken(StageName);

#[async_trait]
impl Stage for Broken {
    fn name(&self) -> &StageName {
        &self.0
    }

    async fn run(&self, _state: PipelineState) -> Result<PipelineState, PipelineError> {
        Err(PipelineError::StageFailed {
            stage: "broken.agent".to_string(),
            reason: "unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn stage_failure_is_a_server_error_with_message() {
    let telemetry = Arc::new(Telemetry::in_memory());
    let gateway = Arc::new(LlmGateway::stub(telemetry.clone()));
    let executor = PipelineExecutor::new(
        vec![
            Box::new(PlannerAgent::new(gateway)) as Box<dyn Stage>,
            Box::new(Broken(StageName::from_static("broken.agent"))),
        ],
        telemetry.clone(),
    );
    let server = TestServer::new(create_router(AppState::new(Arc::new(executor)))).unwrap();

    let response = server
        .post("/run")
        .json(&json!({"task": "Demo task"}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "Stage 'broken.agent' failed: unavailable");

    let spans = telemetry.finished_spans();
    assert_eq!(spans.len(), 2);
    assert!(matches!(spans[1].status, Status::Error { .. }));
}
