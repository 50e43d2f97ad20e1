//! The four pipeline stages.
//!
//! Each stage reads the keys written upstream, makes one model call through
//! the [`LlmGateway`], and writes exactly one new key:
//!
//! | Stage | Reads | Writes |
//! |-------|-------|--------|
//! | [`PlannerAgent`] | `task` | `plan` |
//! | [`WorkerAgent`] | `plan` | `work` |
//! | [`ReflectionAgent`] | `work` | `reflection` |
//! | [`ReviewerAgent`] | `work`, `reflection` | `review` |
//!
//! The reflection is commentary only; nothing loops back on it.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{OperationName, PipelineError, PipelineState, StageName, StateKey};

use crate::LlmGateway;

pub const PLANNER: &str = "planner.agent";
pub const WORKER: &str = "worker.agent";
pub const REFLECTION: &str = "reflection.agent";
pub const REVIEWER: &str = "reviewer.agent";

/// One step of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Span name of the stage.
    fn name(&self) -> &StageName;

    /// Consumes the state and returns it with this stage's key added.
    async fn run(&self, state: PipelineState) -> Result<PipelineState, PipelineError>;
}

pub fn planner_prompt(task: &str) -> String {
    format!("Create a concise 2-step plan for: {task}")
}

pub fn worker_prompt(plan: &str) -> String {
    format!("Execute the following plan and produce a result. Plan: {plan}")
}

pub fn reflection_prompt(work: &str) -> String {
    format!(
        "Act as a senior reviewer. Provide a terse validation summary and one improvement suggestion. \
         The current work output (len={}) is: {work}",
        work.chars().count()
    )
}

pub fn reviewer_prompt(work: &str, reflection: &str) -> String {
    format!(
        "Review the following work taking into account prior reflection. Provide FINAL summary only. \
         Work: {work}\nReflection: {reflection}"
    )
}

struct StageCore {
    name: StageName,
    operation: OperationName,
    gateway: Arc<LlmGateway>,
}

impl StageCore {
    fn new(name: &'static str, operation: &'static str, gateway: Arc<LlmGateway>) -> Self {
        Self {
            name: StageName::from_static(name),
            operation: OperationName::from_static(operation),
            gateway,
        }
    }

    async fn ask(&self, prompt: String) -> String {
        self.gateway.complete(&prompt, &self.operation).await
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Turns the task into a short plan.
pub struct PlannerAgent(StageCore);

impl PlannerAgent {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self(StageCore::new(PLANNER, "llm.completion.planner", gateway))
    }
}

#[async_trait]
impl Stage for PlannerAgent {
    fn name(&self) -> &StageName {
        &self.0.name
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        let prompt = planner_prompt(state.require(StateKey::Task, PLANNER)?);
        let plan = self.0.ask(prompt).await;
        state.insert(StateKey::Plan, plan)?;
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Executes the plan.
pub struct WorkerAgent(StageCore);

impl WorkerAgent {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self(StageCore::new(WORKER, "llm.completion.worker", gateway))
    }
}

#[async_trait]
impl Stage for WorkerAgent {
    fn name(&self) -> &StageName {
        &self.0.name
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        let prompt = worker_prompt(state.require(StateKey::Plan, WORKER)?);
        let work = self.0.ask(prompt).await;
        state.insert(StateKey::Work, work)?;
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Reflection
// ---------------------------------------------------------------------------

/// Critiques the work and suggests one improvement.
pub struct ReflectionAgent(StageCore);

impl ReflectionAgent {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self(StageCore::new(
            REFLECTION,
            "llm.completion.reflection",
            gateway,
        ))
    }
}

#[async_trait]
impl Stage for ReflectionAgent {
    fn name(&self) -> &StageName {
        &self.0.name
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        let prompt = reflection_prompt(state.require(StateKey::Work, REFLECTION)?);
        let reflection = self.0.ask(prompt).await;
        state.insert(StateKey::Reflection, reflection)?;
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Reviewer
// ---------------------------------------------------------------------------

/// Produces the final summary from the work and its reflection.
pub struct ReviewerAgent(StageCore);

impl ReviewerAgent {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self(StageCore::new(REVIEWER, "llm.completion.reviewer", gateway))
    }
}

#[async_trait]
impl Stage for ReviewerAgent {
    fn name(&self) -> &StageName {
        &self.0.name
    }

    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, PipelineError> {
        let prompt = reviewer_prompt(
            state.require(StateKey::Work, REVIEWER)?,
            state.require(StateKey::Reflection, REVIEWER)?,
        );
        let review = self.0.ask(prompt).await;
        state.insert(StateKey::Review, review)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry::Telemetry;

    fn stub_gateway() -> Arc<LlmGateway> {
        Arc::new(LlmGateway::stub(Arc::new(Telemetry::disabled())))
    }

    #[test]
    fn reflection_prompt_reports_character_length() {
        let prompt = reflection_prompt("héllo");
        assert!(prompt.contains("(len=5) is: héllo"));
    }

    #[test]
    fn reviewer_prompt_separates_work_and_reflection() {
        assert_eq!(
            reviewer_prompt("W", "R"),
            "Review the following work taking into account prior reflection. \
             Provide FINAL summary only. Work: W\nReflection: R"
        );
    }

    #[tokio::test]
    async fn planner_writes_the_stub_plan() {
        let state = PlannerAgent::new(stub_gateway())
            .run(PipelineState::new("Demo task"))
            .await
            .unwrap();
        assert_eq!(
            state.get(StateKey::Plan),
            Some("[stub-response] Create a concise 2-step plan for: Demo task...")
        );
    }

    #[tokio::test]
    async fn worker_without_a_plan_fails_with_missing_key() {
        let err = WorkerAgent::new(stub_gateway())
            .run(PipelineState::new("Demo task"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingStateKey {
                stage: WORKER.to_string(),
                key: StateKey::Plan,
            }
        );
    }

    #[tokio::test]
    async fn reviewer_needs_the_reflection() {
        let mut state = PipelineState::new("t");
        state.insert(StateKey::Plan, "p").unwrap();
        state.insert(StateKey::Work, "w").unwrap();

        let err = ReviewerAgent::new(stub_gateway())
            .run(state)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingStateKey {
                key: StateKey::Reflection,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn rerunning_a_stage_is_rejected() {
        let planner = PlannerAgent::new(stub_gateway());
        let state = planner.run(PipelineState::new("t")).await.unwrap();
        let err = planner.run(state).await.unwrap_err();
        assert_eq!(err, PipelineError::StateKeyOverwrite { key: StateKey::Plan });
    }

    #[test]
    fn stage_names_match_span_names() {
        let gateway = stub_gateway();
        assert_eq!(PlannerAgent::new(gateway.clone()).name().as_str(), "planner.agent");
        assert_eq!(WorkerAgent::new(gateway.clone()).name().as_str(), "worker.agent");
        assert_eq!(ReflectionAgent::new(gateway.clone()).name().as_str(), "reflection.agent");
        assert_eq!(ReviewerAgent::new(gateway).name().as_str(), "reviewer.agent");
    }
}
