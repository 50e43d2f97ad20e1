//! Quartet CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: telemetry and provider settings come from the
//!    environment; invalid values stop the process before anything starts.
//! 2. **Wire observability**: [`Telemetry::install`] sets up the JSON log
//!    layer and, when configured, OTLP export of spans and metrics.
//! 3. **Construct infrastructure**: build the LLM provider (or stub mode), the
//!    gateway, and the standard four-stage executor.
//! 4. **Select a command**:
//!    - `serve` runs the HTTP API until Ctrl-C.
//!    - `run --task` runs the pipeline once and prints the result as JSON.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use llm::ProviderSettings;
use nodes::{LlmGateway, PipelineExecutor};
use server::{AppState, RunResponse};
use telemetry::{Telemetry, TelemetryConfig};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "quartet", version, about = "Instrumented plan, work, reflect, review pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "QUARTET_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,
    },
    /// Run the pipeline once and print the result as JSON.
    Run {
        /// Task description handed to the planner.
        #[arg(long)]
        task: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let telemetry_config =
        TelemetryConfig::from_env().context("Invalid telemetry configuration")?;
    let settings = ProviderSettings::from_env().context("Invalid LLM provider configuration")?;

    let telemetry = Arc::new(Telemetry::install(telemetry_config));
    info!(?settings, "Starting Quartet");

    let provider = llm::build_provider(&settings).context("Failed to build the LLM provider")?;
    let gateway = Arc::new(LlmGateway::new(
        provider,
        settings.max_tokens,
        telemetry.clone(),
    ));
    let executor = Arc::new(PipelineExecutor::standard(gateway));

    let outcome = match cli.command {
        Command::Serve { bind } => server::serve(bind, AppState::new(executor))
            .await
            .map_err(anyhow::Error::from),
        Command::Run { task } => run_once(&executor, &task).await,
    };

    telemetry.shutdown();
    outcome
}

async fn run_once(executor: &PipelineExecutor, task: &str) -> anyhow::Result<()> {
    let state = executor.run(task).await.context("Pipeline run failed")?;
    let response = RunResponse::from_state(&state);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
