//! The telemetry context.
//!
//! A [`Telemetry`] value owns every exporter and metric recorder for the
//! process and is passed explicitly to the code that opens spans. Only the
//! global `tracing` subscriber is process-wide, and [`Telemetry::install`] is
//! the one place that sets it.

use std::sync::Arc;

use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use pipeline::{TokenCount, TokenDirection};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::DEFAULT_LOG_FILTER;
use crate::conventions::{attributes, metrics};
use crate::span::SPAN_TARGET;
use crate::{
    InMemoryMetrics, InMemorySpanExporter, LlmLabels, MetricsRecorder, OtelMetrics, ScopedSpan,
    SpanExporter, SpanRecord, TelemetryConfig,
};

/// Errors raised while setting up exporters or the subscriber.
///
/// [`Telemetry::install`] logs these and carries on without the failed part.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to build the {signal} exporter: {message}")]
    Exporter { signal: &'static str, message: String },

    #[error("Failed to install the tracing subscriber: {0}")]
    Subscriber(String),
}

struct OtlpProviders {
    tracer: TracerProvider,
    meter: SdkMeterProvider,
}

/// Exporters, metric recorders, and configuration for one process.
pub struct Telemetry {
    config: TelemetryConfig,
    span_exporters: Vec<Arc<dyn SpanExporter>>,
    metric_recorders: Vec<Arc<dyn MetricsRecorder>>,
    in_memory_spans: Option<Arc<InMemorySpanExporter>>,
    in_memory_metrics: Option<Arc<InMemoryMetrics>>,
    otlp: Option<OtlpProviders>,
}

impl Telemetry {
    pub fn builder(config: TelemetryConfig) -> TelemetryBuilder {
        TelemetryBuilder {
            config,
            span_exporters: Vec::new(),
            metric_recorders: Vec::new(),
            in_memory: false,
        }
    }

    /// A context that records nothing. Spans still open and close normally.
    pub fn disabled() -> Self {
        Self::builder(TelemetryConfig::default()).build()
    }

    /// A context that captures spans and metrics in memory, with default
    /// configuration.
    pub fn in_memory() -> Self {
        Self::builder(TelemetryConfig::default())
            .with_in_memory()
            .build()
    }

    /// Installs the global `tracing` subscriber and builds the exporters
    /// `config` asks for.
    ///
    /// Logs go to stderr as JSON, filtered by `config.log_filter`. When an OTLP
    /// endpoint is configured, mirrored spans and metric instruments are
    /// exported there as well. Any part that fails to start is reported and
    /// skipped; the returned context is always usable.
    pub fn install(config: TelemetryConfig) -> Self {
        let mut problems = Vec::new();
        let resource = resource(&config);
        let otlp = config
            .otlp_endpoint
            .as_deref()
            .and_then(|endpoint| match otlp_providers(endpoint, resource) {
                Ok(providers) => Some(providers),
                Err(e) => {
                    problems.push(e);
                    None
                }
            });

        let otel_layer = otlp.as_ref().map(|providers| {
            let tracer = providers.tracer.tracer(metrics::METER_NAME);
            let targets = Targets::new()
                .with_target(SPAN_TARGET, LevelFilter::TRACE)
                .with_target("tower_http", LevelFilter::DEBUG);
            tracing_opentelemetry::layer()
                .with_tracer(tracer)
                .with_filter(targets)
        });

        let filter = EnvFilter::try_new(&config.log_filter)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter);

        if let Err(e) = tracing_subscriber::registry()
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()
        {
            problems.push(TelemetryError::Subscriber(e.to_string()));
        }
        for problem in &problems {
            warn!(error = %problem, "Telemetry component unavailable; continuing without it");
        }

        let mut builder = Self::builder(config);
        if let Some(providers) = &otlp {
            let meter = providers.meter.meter(metrics::METER_NAME);
            builder = builder.with_metrics_recorder(Arc::new(OtelMetrics::new(&meter)));
        }
        let mut telemetry = builder.build();
        telemetry.otlp = otlp;

        info!(
            service = %telemetry.config.service_name,
            otlp = telemetry.otlp.is_some(),
            in_memory = telemetry.in_memory_spans.is_some(),
            "Telemetry initialised"
        );
        telemetry
    }

    /// Opens a span named `name`. It closes when the guard is dropped.
    pub fn start_span(&self, name: &str) -> ScopedSpan<'_> {
        ScopedSpan::start(self, name)
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Spans captured by the in-memory exporter; empty when it is disabled.
    pub fn finished_spans(&self) -> Vec<SpanRecord> {
        self.in_memory_spans
            .as_ref()
            .map(|exporter| exporter.spans())
            .unwrap_or_default()
    }

    pub fn in_memory_spans(&self) -> Option<&Arc<InMemorySpanExporter>> {
        self.in_memory_spans.as_ref()
    }

    pub fn in_memory_metrics(&self) -> Option<&Arc<InMemoryMetrics>> {
        self.in_memory_metrics.as_ref()
    }

    /// Adds `count` tokens to the token counter on every recorder.
    pub fn add_tokens(&self, direction: TokenDirection, count: TokenCount, labels: &LlmLabels) {
        for recorder in &self.metric_recorders {
            recorder.add_tokens(direction, count, labels);
        }
    }

    /// Records one operation duration on every recorder.
    pub fn record_duration(&self, millis: f64, labels: &LlmLabels) {
        for recorder in &self.metric_recorders {
            recorder.record_duration(millis, labels);
        }
    }

    pub(crate) fn export_span(&self, record: &SpanRecord) {
        for exporter in &self.span_exporters {
            exporter.export(record);
        }
    }

    /// Flushes and stops the OTLP providers, if any.
    pub fn shutdown(&self) {
        let Some(providers) = &self.otlp else {
            return;
        };
        debug!("Flushing OTLP exporters");
        if let Err(e) = providers.tracer.shutdown() {
            warn!(error = %e, "Trace provider shutdown failed");
        }
        if let Err(e) = providers.meter.shutdown() {
            warn!(error = %e, "Meter provider shutdown failed");
        }
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("config", &self.config)
            .field("span_exporters", &self.span_exporters.len())
            .field("metric_recorders", &self.metric_recorders.len())
            .field("otlp", &self.otlp.is_some())
            .finish()
    }
}

/// Builder for [`Telemetry`] contexts that do not touch global state.
pub struct TelemetryBuilder {
    config: TelemetryConfig,
    span_exporters: Vec<Arc<dyn SpanExporter>>,
    metric_recorders: Vec<Arc<dyn MetricsRecorder>>,
    in_memory: bool,
}

impl TelemetryBuilder {
    pub fn with_span_exporter(mut self, exporter: Arc<dyn SpanExporter>) -> Self {
        self.span_exporters.push(exporter);
        self
    }

    pub fn with_metrics_recorder(mut self, recorder: Arc<dyn MetricsRecorder>) -> Self {
        self.metric_recorders.push(recorder);
        self
    }

    /// Adds the in-memory span exporter and metrics recorder. Setting
    /// `in_memory_exporter` in the configuration has the same effect.
    pub fn with_in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    pub fn build(self) -> Telemetry {
        let mut span_exporters = self.span_exporters;
        let mut metric_recorders = self.metric_recorders;

        let (in_memory_spans, in_memory_metrics) = if self.in_memory || self.config.in_memory_exporter {
            let spans = Arc::new(InMemorySpanExporter::new());
            let metrics = Arc::new(InMemoryMetrics::new());
            span_exporters.push(spans.clone());
            metric_recorders.push(metrics.clone());
            (Some(spans), Some(metrics))
        } else {
            (None, None)
        };

        Telemetry {
            config: self.config,
            span_exporters,
            metric_recorders,
            in_memory_spans,
            in_memory_metrics,
            otlp: None,
        }
    }
}

fn resource(config: &TelemetryConfig) -> Resource {
    Resource::new(vec![
        KeyValue::new(attributes::SERVICE_NAME, config.service_name.clone()),
        KeyValue::new(attributes::SERVICE_VERSION, config.service_version.clone()),
        KeyValue::new(
            attributes::DEPLOYMENT_ENVIRONMENT,
            config.deployment_environment.clone(),
        ),
    ])
}

fn otlp_providers(endpoint: &str, resource: Resource) -> Result<OtlpProviders, TelemetryError> {
    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "span",
            message: e.to_string(),
        })?;
    let tracer = TracerProvider::builder()
        .with_batch_exporter(span_exporter, runtime::Tokio)
        .with_resource(resource.clone())
        .build();

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "metric",
            message: e.to_string(),
        })?;
    let reader = PeriodicReader::builder(metric_exporter, runtime::Tokio).build();
    let meter = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build();

    Ok(OtlpProviders { tracer, meter })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{ModelName, OperationName};

    #[test]
    fn disabled_context_has_no_sinks() {
        let telemetry = Telemetry::disabled();
        assert!(telemetry.in_memory_spans().is_none());
        assert!(telemetry.in_memory_metrics().is_none());
        telemetry.start_span("nothing").end();
        assert!(telemetry.finished_spans().is_empty());
        telemetry.shutdown();
    }

    #[test]
    fn in_memory_context_captures_spans_in_close_order() {
        let telemetry = Telemetry::in_memory();
        {
            let _outer = telemetry.start_span("outer");
            telemetry.start_span("inner").end();
        }
        let names: Vec<_> = telemetry
            .finished_spans()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["inner", "outer"]);
    }

    #[test]
    fn config_toggle_and_builder_toggle_agree() {
        let telemetry =
            Telemetry::builder(TelemetryConfig::default().with_in_memory_exporter()).build();
        assert!(telemetry.in_memory_spans().is_some());
        assert!(telemetry.config().in_memory_exporter);
    }

    #[test]
    fn reset_empties_the_in_memory_capture() {
        let telemetry = Telemetry::in_memory();
        telemetry.start_span("a").end();
        telemetry.in_memory_spans().unwrap().reset();
        assert!(telemetry.finished_spans().is_empty());
    }

    #[test]
    fn metric_updates_reach_every_recorder() {
        let extra = Arc::new(InMemoryMetrics::new());
        let telemetry = Telemetry::builder(TelemetryConfig::default())
            .with_in_memory()
            .with_metrics_recorder(extra.clone())
            .build();
        let labels = LlmLabels::new(
            ModelName::new("m").unwrap(),
            OperationName::new("op").unwrap(),
        );

        telemetry.add_tokens(TokenDirection::Input, TokenCount::new(3), &labels);
        telemetry.record_duration(2.0, &labels);

        let own = telemetry.in_memory_metrics().unwrap();
        assert_eq!(own.token_total(TokenDirection::Input, &labels), 3);
        assert_eq!(extra.token_total(TokenDirection::Input, &labels), 3);
        assert_eq!(extra.durations(&labels), vec![2.0]);
    }

    #[test]
    fn resource_carries_service_identity() {
        let config = TelemetryConfig {
            service_name: "svc".to_string(),
            deployment_environment: "prod".to_string(),
            ..TelemetryConfig::default()
        };
        let resource = resource(&config);
        assert_eq!(
            resource.get(attributes::SERVICE_NAME.into()),
            Some("svc".into())
        );
        assert_eq!(
            resource.get(attributes::DEPLOYMENT_ENVIRONMENT.into()),
            Some("prod".into())
        );
    }
}
