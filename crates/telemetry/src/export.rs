//! Span exporters.
//!
//! OTLP export does not go through this trait: it is handled by the
//! `tracing-opentelemetry` layer installed in [`crate::Telemetry::install`].
//! Exporters here receive the finished [`SpanRecord`] directly, which is what
//! the in-memory toggle and the tests rely on.

use std::sync::{Mutex, MutexGuard};

use crate::SpanRecord;

/// A sink for finished spans.
///
/// Called from `Drop`, so implementations must not panic and should return
/// quickly.
pub trait SpanExporter: Send + Sync {
    fn export(&self, span: &SpanRecord);
}

/// Keeps every finished span in memory, in the order the spans closed.
#[derive(Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Mutex<Vec<SpanRecord>>,
}

impl InMemorySpanExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every span exported so far.
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.lock().clone()
    }

    /// Returns the finished spans named `name`.
    pub fn spans_named(&self, name: &str) -> Vec<SpanRecord> {
        self.lock()
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    /// Discards every captured span.
    pub fn reset(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock must not disable span capture for the
    // rest of the process.
    fn lock(&self) -> MutexGuard<'_, Vec<SpanRecord>> {
        self.spans.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&self, span: &SpanRecord) {
        self.lock().push(span.clone());
    }
}
