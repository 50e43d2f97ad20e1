//! Process-wide metric instruments.
//!
//! Two instruments exist: a token counter and an operation-duration histogram.
//! [`MetricsRecorder`] is the seam between the code that observes a model call
//! and the backend that accumulates it. Both implementations accept concurrent
//! updates from any number of in-flight requests without losing increments.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;
use pipeline::{ModelName, OperationName, TokenCount, TokenDirection};

use crate::conventions::{metrics, units};

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Identifies the model call a measurement belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LlmLabels {
    pub model: ModelName,
    pub operation: OperationName,
}

impl LlmLabels {
    pub fn new(model: ModelName, operation: OperationName) -> Self {
        Self { model, operation }
    }

    fn key_values(&self) -> [KeyValue; 2] {
        [
            KeyValue::new(metrics::MODEL, self.model.to_string()),
            KeyValue::new(metrics::OPERATION, self.operation.to_string()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Seam
// ---------------------------------------------------------------------------

/// Receives metric updates for model calls.
pub trait MetricsRecorder: Send + Sync {
    /// Adds `count` tokens to the counter series for `direction` and `labels`.
    fn add_tokens(&self, direction: TokenDirection, count: TokenCount, labels: &LlmLabels);

    /// Records one operation duration in milliseconds.
    fn record_duration(&self, millis: f64, labels: &LlmLabels);
}

// ---------------------------------------------------------------------------
// OpenTelemetry instruments
// ---------------------------------------------------------------------------

/// Forwards updates to OpenTelemetry instruments created from a [`Meter`].
pub struct OtelMetrics {
    tokens: Counter<u64>,
    duration: Histogram<f64>,
}

impl OtelMetrics {
    pub fn new(meter: &Meter) -> Self {
        let tokens = meter
            .u64_counter(metrics::TOKENS)
            .with_description("Tokens consumed by model calls")
            .with_unit(units::TOKENS)
            .build();
        let duration = meter
            .f64_histogram(metrics::OPERATION_DURATION)
            .with_description("Wall-clock duration of model calls")
            .with_unit(units::MILLISECONDS)
            .build();
        Self { tokens, duration }
    }
}

impl MetricsRecorder for OtelMetrics {
    fn add_tokens(&self, direction: TokenDirection, count: TokenCount, labels: &LlmLabels) {
        let [model, operation] = labels.key_values();
        self.tokens.add(
            count.as_u64(),
            &[
                KeyValue::new(metrics::TOKEN_DIRECTION, direction.as_str()),
                model,
                operation,
            ],
        );
    }

    fn record_duration(&self, millis: f64, labels: &LlmLabels) {
        self.duration.record(millis, &labels.key_values());
    }
}

// ---------------------------------------------------------------------------
// In-memory accumulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TokenSeries {
    direction: TokenDirection,
    labels: LlmLabels,
}

#[derive(Debug, Default)]
struct Accumulated {
    tokens: HashMap<TokenSeries, u64>,
    durations: HashMap<LlmLabels, Vec<f64>>,
}

/// Accumulates updates in memory so they can be read back.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    state: Mutex<Accumulated>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of the token counter series for `direction` and `labels`.
    pub fn token_total(&self, direction: TokenDirection, labels: &LlmLabels) -> u64 {
        let series = TokenSeries {
            direction,
            labels: labels.clone(),
        };
        self.lock().tokens.get(&series).copied().unwrap_or(0)
    }

    /// Every duration recorded for `labels`, in recording order.
    pub fn durations(&self, labels: &LlmLabels) -> Vec<f64> {
        self.lock().durations.get(labels).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Accumulated> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MetricsRecorder for InMemoryMetrics {
    fn add_tokens(&self, direction: TokenDirection, count: TokenCount, labels: &LlmLabels) {
        let series = TokenSeries {
            direction,
            labels: labels.clone(),
        };
        let mut state = self.lock();
        let total = state.tokens.entry(series).or_insert(0);
        *total = total.saturating_add(count.as_u64());
    }

    fn record_duration(&self, millis: f64, labels: &LlmLabels) {
        self.lock()
            .durations
            .entry(labels.clone())
            .or_default()
            .push(millis);
    }
}
