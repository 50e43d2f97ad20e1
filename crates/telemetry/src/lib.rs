//! Telemetry for the Quartet pipeline.
//!
//! Everything here hangs off a [`Telemetry`] context that callers construct
//! once and pass around explicitly:
//!
//! | Module | Provides |
//! |--------|----------|
//! | [`config`] | [`TelemetryConfig`], read from the environment |
//! | [`context`] | [`Telemetry`], its builder, and OTLP/subscriber installation |
//! | [`span`] | [`ScopedSpan`] guards and the [`SpanRecord`]s they export |
//! | [`instrument`] | [`instrumented`] / [`instrumented_blocking`] and [`SpanOutcome`] |
//! | [`llm`] | Response, token, and content recorders for model-call spans |
//! | [`metrics`] | The token counter and duration histogram behind [`MetricsRecorder`] |
//! | [`export`] | [`SpanExporter`] and the in-memory exporter |
//! | [`conventions`] | Attribute, event, and instrument names |

pub mod config;
pub mod context;
pub mod conventions;
pub mod export;
pub mod instrument;
pub mod llm;
pub mod metrics;
pub mod span;

pub use config::TelemetryConfig;
pub use context::{Telemetry, TelemetryBuilder, TelemetryError};
pub use export::{InMemorySpanExporter, SpanExporter};
pub use instrument::{instrumented, instrumented_blocking, SpanOutcome};
pub use metrics::{InMemoryMetrics, LlmLabels, MetricsRecorder, OtelMetrics};
pub use span::{ScopedSpan, SpanEvent, SpanRecord};

pub use opentelemetry::trace::Status;
pub use opentelemetry::{KeyValue, Value};
