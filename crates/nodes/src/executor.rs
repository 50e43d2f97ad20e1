//! Sequential pipeline executor.

use std::sync::Arc;

use pipeline::{PipelineError, PipelineRunId, PipelineState};
use telemetry::conventions::attributes;
use telemetry::{instrumented, KeyValue, Telemetry};
use tracing::info;

use crate::stages::{PlannerAgent, ReflectionAgent, ReviewerAgent, Stage, WorkerAgent};
use crate::LlmGateway;

/// Runs stages in order, each inside its own instrumented span.
///
/// Every run gets a fresh [`PipelineRunId`] which, together with the stage's
/// position, is attached to each stage span. The first failing stage ends the
/// run; later stages do not execute.
pub struct PipelineExecutor {
    stages: Vec<Box<dyn Stage>>,
    telemetry: Arc<Telemetry>,
}

impl PipelineExecutor {
    pub fn new(stages: Vec<Box<dyn Stage>>, telemetry: Arc<Telemetry>) -> Self {
        Self { stages, telemetry }
    }

    /// Planner, worker, reflection, reviewer, all sharing `gateway`.
    pub fn standard(gateway: Arc<LlmGateway>) -> Self {
        let telemetry = gateway.telemetry().clone();
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(PlannerAgent::new(gateway.clone())),
            Box::new(WorkerAgent::new(gateway.clone())),
            Box::new(ReflectionAgent::new(gateway.clone())),
            Box::new(ReviewerAgent::new(gateway)),
        ];
        Self::new(stages, telemetry)
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    /// Runs every stage against a state seeded with `task`.
    pub async fn run(&self, task: &str) -> Result<PipelineState, PipelineError> {
        let run_id = PipelineRunId::new_random();
        info!(run_id = %run_id, stages = self.stages.len(), "Pipeline run started");

        let mut state = PipelineState::new(task);
        for (index, stage) in self.stages.iter().enumerate() {
            let static_attributes = [
                KeyValue::new(attributes::PIPELINE_RUN_ID, run_id.to_string()),
                KeyValue::new(
                    attributes::PIPELINE_STAGE_INDEX,
                    i64::try_from(index).unwrap_or(i64::MAX),
                ),
            ];
            let name = stage.name().as_str();
            state = instrumented(&self.telemetry, name, &static_attributes, || {
                stage.run(state)
            })
            .await?;
        }

        info!(run_id = %run_id, keys = state.len(), "Pipeline run finished");
        Ok(state)
    }
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.name().as_str()).collect();
        f.debug_struct("PipelineExecutor")
            .field("stages", &names)
            .finish_non_exhaustive()
    }
}
