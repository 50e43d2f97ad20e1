//! Scoped spans and the records they produce.
//!
//! A [`ScopedSpan`] is an RAII guard. While it is alive it accumulates a
//! [`SpanRecord`] and mirrors every change onto a `tracing` span, which the
//! `tracing-opentelemetry` layer forwards to OTLP when configured. When the
//! guard is dropped (including when the owning future is cancelled) the
//! record is stamped with its end time and handed to every configured
//! [`crate::SpanExporter`].

use std::borrow::Cow;
use std::time::Instant;

use opentelemetry::trace::Status;
use opentelemetry::{KeyValue, Value};
use pipeline::Timestamp;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::conventions::{attributes, events};
use crate::Telemetry;

/// `tracing` target used for every span and event mirrored by [`ScopedSpan`].
pub const SPAN_TARGET: &str = "quartet::telemetry";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A timestamped event attached to a span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp: Timestamp,
    pub attributes: Vec<KeyValue>,
}

impl SpanEvent {
    /// Returns the value of attribute `key`, if present.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        find(&self.attributes, key)
    }
}

/// A finished (or in-progress) span as seen by exporters.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    pub name: String,
    pub start: Timestamp,
    /// `None` only while the span is still open.
    pub end: Option<Timestamp>,
    pub attributes: Vec<KeyValue>,
    pub status: Status,
    pub events: Vec<SpanEvent>,
}

impl SpanRecord {
    fn new(name: String) -> Self {
        Self {
            name,
            start: Timestamp::now(),
            end: None,
            attributes: Vec::new(),
            status: Status::Unset,
            events: Vec::new(),
        }
    }

    /// Returns the value of attribute `key`, if present.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        find(&self.attributes, key)
    }

    /// Returns `true` if the span status is ERROR.
    pub fn is_error(&self) -> bool {
        matches!(self.status, Status::Error { .. })
    }

    /// Returns the events named `name`, in recording order.
    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SpanEvent> + 'a {
        self.events.iter().filter(move |e| e.name == name)
    }

    fn upsert(&mut self, attribute: KeyValue) {
        match self.attributes.iter_mut().find(|kv| kv.key == attribute.key) {
            Some(existing) => existing.value = attribute.value,
            None => self.attributes.push(attribute),
        }
    }
}

fn find<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a Value> {
    attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| &kv.value)
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

/// An open span that closes and exports itself when dropped.
///
/// Created with [`Telemetry::start_span`].
pub struct ScopedSpan<'a> {
    telemetry: &'a Telemetry,
    record: Option<SpanRecord>,
    span: tracing::Span,
    started: Instant,
}

impl<'a> ScopedSpan<'a> {
    pub(crate) fn start(telemetry: &'a Telemetry, name: &str) -> Self {
        let span = tracing::info_span!(
            target: SPAN_TARGET,
            "span",
            otel.name = %name,
            otel.status_code = tracing::field::Empty,
            otel.status_message = tracing::field::Empty,
        );
        Self {
            telemetry,
            record: Some(SpanRecord::new(name.to_string())),
            span,
            started: Instant::now(),
        }
    }

    /// The telemetry context this span reports to.
    pub fn telemetry(&self) -> &'a Telemetry {
        self.telemetry
    }

    /// The mirrored `tracing` span; instrument futures or enter it so that
    /// nested spans and log lines are parented correctly.
    pub fn tracing_span(&self) -> &tracing::Span {
        &self.span
    }

    /// The span name.
    pub fn name(&self) -> &str {
        self.record.as_ref().map(|r| r.name.as_str()).unwrap_or_default()
    }

    /// Milliseconds elapsed since the span was opened.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Sets (or replaces) an attribute.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        self.span
            .set_attribute(attribute.key.clone(), attribute.value.clone());
        if let Some(record) = self.record.as_mut() {
            record.upsert(attribute);
        }
    }

    /// Appends an event.
    pub fn add_event(&mut self, name: impl Into<Cow<'static, str>>, attributes: Vec<KeyValue>) {
        let name = name.into();
        tracing::info!(
            target: SPAN_TARGET,
            parent: &self.span,
            attributes = %render(&attributes),
            "{}",
            name
        );
        if let Some(record) = self.record.as_mut() {
            record.events.push(SpanEvent {
                name: name.into_owned(),
                timestamp: Timestamp::now(),
                attributes,
            });
        }
    }

    /// Records `error` as an `exception` event.
    ///
    /// Does not change the status; callers pair this with [`set_status`].
    ///
    /// [`set_status`]: ScopedSpan::set_status
    pub fn record_exception<E>(&mut self, error: &E)
    where
        E: std::error::Error + ?Sized,
    {
        let exception_type = std::any::type_name::<E>();
        let message = error.to_string();
        tracing::error!(
            target: SPAN_TARGET,
            parent: &self.span,
            exception_type = exception_type,
            exception_message = %message,
            "exception"
        );
        if let Some(record) = self.record.as_mut() {
            record.events.push(SpanEvent {
                name: events::EXCEPTION.to_string(),
                timestamp: Timestamp::now(),
                attributes: vec![
                    KeyValue::new(attributes::EXCEPTION_TYPE, exception_type),
                    KeyValue::new(attributes::EXCEPTION_MESSAGE, message),
                ],
            });
        }
    }

    /// Sets the span status.
    pub fn set_status(&mut self, status: Status) {
        match &status {
            Status::Ok => {
                self.span.record("otel.status_code", "OK");
            }
            Status::Error { description } => {
                self.span.record("otel.status_code", "ERROR");
                self.span.record("otel.status_message", &**description);
            }
            Status::Unset => {}
        }
        if let Some(record) = self.record.as_mut() {
            record.status = status;
        }
    }

    /// Closes the span now. Equivalent to dropping it.
    pub fn end(self) {}
}

impl Drop for ScopedSpan<'_> {
    fn drop(&mut self) {
        if let Some(mut record) = self.record.take() {
            record.end = Some(Timestamp::now());
            self.telemetry.export_span(&record);
        }
    }
}

impl std::fmt::Debug for ScopedSpan<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedSpan")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// Converts a byte or character count into an `i64` attribute value.
pub(crate) fn count_value(n: impl TryInto<i64>) -> i64 {
    n.try_into().unwrap_or(i64::MAX)
}

fn render(attributes: &[KeyValue]) -> String {
    attributes
        .iter()
        .map(|kv| format!("{}={}", kv.key, kv.value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_the_guard_exports_exactly_once() {
        let telemetry = Telemetry::in_memory();
        {
            let mut span = telemetry.start_span("unit.of.work");
            span.set_attribute(KeyValue::new("k", 1_i64));
        }
        let spans = telemetry.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "unit.of.work");
        assert!(spans[0].end.is_some());
        assert!(spans[0].end >= Some(spans[0].start));
    }

    #[test]
    fn set_attribute_replaces_existing_value() {
        let telemetry = Telemetry::in_memory();
        let mut span = telemetry.start_span("s");
        span.set_attribute(KeyValue::new("k", 1_i64));
        span.set_attribute(KeyValue::new("k", 2_i64));
        span.end();

        let record = &telemetry.finished_spans()[0];
        assert_eq!(record.attributes.len(), 1);
        assert_eq!(record.attribute("k"), Some(&Value::I64(2)));
    }

    #[test]
    fn exception_event_carries_type_and_message() {
        let telemetry = Telemetry::in_memory();
        let mut span = telemetry.start_span("s");
        let error = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        span.record_exception(&error);
        span.set_status(Status::error(error.to_string()));
        span.end();

        let record = &telemetry.finished_spans()[0];
        assert!(record.is_error());
        let exception = record.events_named(events::EXCEPTION).next().unwrap();
        assert_eq!(
            exception.attribute(attributes::EXCEPTION_MESSAGE).map(|v| v.as_str()),
            Some("disk on fire".into())
        );
        assert_eq!(
            exception.attribute(attributes::EXCEPTION_TYPE).map(|v| v.as_str()),
            Some("std::io::error::Error".into())
        );
    }

    #[test]
    fn disabled_telemetry_still_closes_spans_silently() {
        let telemetry = Telemetry::disabled();
        let mut span = telemetry.start_span("quiet");
        span.set_status(Status::Ok);
        span.end();
        assert!(telemetry.finished_spans().is_empty());
    }
}
