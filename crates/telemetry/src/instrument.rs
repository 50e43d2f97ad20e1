//! The instrumented-call wrapper.
//!
//! [`instrumented`] and [`instrumented_blocking`] run a unit of work under a
//! freshly opened [`ScopedSpan`]:
//!
//! - static attributes are applied on entry;
//! - on `Ok`, the value annotates the span through [`SpanOutcome`] and the
//!   status becomes OK;
//! - on `Err`, an `exception` event is recorded, the status becomes ERROR with
//!   the error's message, and the very same error value is returned;
//! - `duration_ms` is recorded on both paths.
//!
//! The span is closed by the guard, so it is exported even if the async
//! version is cancelled mid-flight.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use opentelemetry::trace::Status;
use opentelemetry::KeyValue;
use pipeline::PipelineState;
use tracing::Instrument;

use crate::conventions::attributes;
use crate::span::count_value;
use crate::{ScopedSpan, Telemetry};

// ---------------------------------------------------------------------------
// Outcome annotation
// ---------------------------------------------------------------------------

/// Lets a successful result describe itself on the span that produced it.
///
/// Mappings record `state.keys` and `state.size`; plain values record nothing.
pub trait SpanOutcome {
    fn annotate(&self, _span: &mut ScopedSpan<'_>) {}
}

fn annotate_mapping(span: &mut ScopedSpan<'_>, keys: usize, size: usize) {
    span.set_attribute(KeyValue::new(attributes::STATE_KEYS, count_value(keys)));
    span.set_attribute(KeyValue::new(attributes::STATE_SIZE, count_value(size)));
}

fn chars_in<V: AsRef<str>>(values: impl Iterator<Item = V>) -> usize {
    values.map(|v| v.as_ref().chars().count()).sum()
}

impl SpanOutcome for PipelineState {
    fn annotate(&self, span: &mut ScopedSpan<'_>) {
        annotate_mapping(span, self.len(), self.total_value_chars());
    }
}

impl<K, V> SpanOutcome for BTreeMap<K, V>
where
    V: AsRef<str>,
{
    fn annotate(&self, span: &mut ScopedSpan<'_>) {
        annotate_mapping(span, self.len(), chars_in(self.values()));
    }
}

impl<K, V, S> SpanOutcome for HashMap<K, V, S>
where
    V: AsRef<str>,
{
    fn annotate(&self, span: &mut ScopedSpan<'_>) {
        annotate_mapping(span, self.len(), chars_in(self.values()));
    }
}

impl SpanOutcome for () {}
impl SpanOutcome for String {}
impl SpanOutcome for &str {}
impl SpanOutcome for bool {}
impl SpanOutcome for i64 {}
impl SpanOutcome for u64 {}
impl SpanOutcome for usize {}

// ---------------------------------------------------------------------------
// Wrappers
// ---------------------------------------------------------------------------

/// Runs the future produced by `work` under a span named `name`.
pub async fn instrumented<T, E, F, Fut>(
    telemetry: &Telemetry,
    name: &str,
    static_attributes: &[KeyValue],
    work: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    T: SpanOutcome,
    E: std::error::Error,
{
    let mut span = open(telemetry, name, static_attributes);
    let result = work().instrument(span.tracing_span().clone()).await;
    close(&mut span, &result);
    result
}

/// Runs `work` under a span named `name`, blocking the caller.
pub fn instrumented_blocking<T, E, F>(
    telemetry: &Telemetry,
    name: &str,
    static_attributes: &[KeyValue],
    work: F,
) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    T: SpanOutcome,
    E: std::error::Error,
{
    let mut span = open(telemetry, name, static_attributes);
    let result = span.tracing_span().clone().in_scope(work);
    close(&mut span, &result);
    result
}

fn open<'a>(telemetry: &'a Telemetry, name: &str, static_attributes: &[KeyValue]) -> ScopedSpan<'a> {
    let mut span = telemetry.start_span(name);
    for attribute in static_attributes {
        span.set_attribute(attribute.clone());
    }
    span
}

fn close<T, E>(span: &mut ScopedSpan<'_>, result: &Result<T, E>)
where
    T: SpanOutcome,
    E: std::error::Error,
{
    let elapsed = span.elapsed_ms();
    span.set_attribute(KeyValue::new(attributes::DURATION_MS, elapsed));
    match result {
        Ok(value) => {
            value.annotate(span);
            span.set_status(Status::Ok);
        }
        Err(error) => {
            span.record_exception(error);
            span.set_status(Status::error(error.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::events;
    use opentelemetry::Value;
    use pipeline::{PipelineError, StateKey};

    #[derive(Debug, PartialEq, Eq)]
    struct Forced(u32);

    impl std::fmt::Display for Forced {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "forced failure #{}", self.0)
        }
    }

    impl std::error::Error for Forced {}

    #[tokio::test]
    async fn success_produces_one_ok_span_with_state_attributes() {
        let telemetry = Telemetry::in_memory();
        let mut state = PipelineState::new("Demo task");

        let result = instrumented(&telemetry, "planner.agent", &[], || async move {
            state.insert(StateKey::Plan, "step one")?;
            Ok::<_, PipelineError>(state)
        })
        .await
        .unwrap();

        let spans = telemetry.finished_spans();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.name, "planner.agent");
        assert_eq!(span.status, Status::Ok);
        assert_eq!(
            span.attribute(attributes::STATE_KEYS),
            Some(&Value::I64(result.len() as i64))
        );
        assert_eq!(span.attribute(attributes::STATE_SIZE), Some(&Value::I64(17)));
        assert!(matches!(
            span.attribute(attributes::DURATION_MS),
            Some(Value::F64(ms)) if *ms >= 0.0
        ));
    }

    #[tokio::test]
    async fn failure_marks_error_and_returns_the_same_error() {
        let telemetry = Telemetry::in_memory();

        let err = instrumented(&telemetry, "failing.agent", &[], || async {
            Err::<(), _>(Forced(7))
        })
        .await
        .unwrap_err();

        assert_eq!(err, Forced(7));
        let spans = telemetry.finished_spans();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.name, "failing.agent");
        assert_eq!(span.status, Status::error("forced failure #7"));
        assert_eq!(span.events_named(events::EXCEPTION).count(), 1);
        assert!(span.attribute(attributes::STATE_KEYS).is_none());
    }

    #[tokio::test]
    async fn static_attributes_are_applied() {
        let telemetry = Telemetry::in_memory();
        let attrs = [
            KeyValue::new("agent.role", "planner"),
            KeyValue::new("pipeline.stage_index", 0_i64),
        ];

        instrumented(&telemetry, "planner.agent", &attrs, || async {
            Ok::<_, Forced>(())
        })
        .await
        .unwrap();

        let span = &telemetry.finished_spans()[0];
        assert_eq!(
            span.attribute("agent.role").map(|v| v.as_str()),
            Some("planner".into())
        );
        assert_eq!(span.attribute("pipeline.stage_index"), Some(&Value::I64(0)));
    }

    #[tokio::test]
    async fn plain_values_do_not_record_state_attributes() {
        let telemetry = Telemetry::in_memory();
        let text = instrumented(&telemetry, "plain", &[], || async {
            Ok::<_, Forced>("hello".to_string())
        })
        .await
        .unwrap();

        assert_eq!(text, "hello");
        let span = &telemetry.finished_spans()[0];
        assert!(span.attribute(attributes::STATE_KEYS).is_none());
        assert_eq!(span.status, Status::Ok);
    }

    #[tokio::test]
    async fn cancelled_work_still_closes_its_span() {
        let telemetry = Telemetry::in_memory();
        {
            let pending = instrumented(&telemetry, "cancelled", &[], || {
                std::future::pending::<Result<(), Forced>>()
            });
            let outcome =
                tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;
            assert!(outcome.is_err());
        }

        let spans = telemetry.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "cancelled");
        assert_eq!(spans[0].status, Status::Unset);
        assert!(spans[0].end.is_some());
    }

    #[test]
    fn blocking_wrapper_records_mappings() {
        let telemetry = Telemetry::in_memory();
        let mut map = HashMap::new();
        map.insert("a", "xy".to_string());
        map.insert("b", "z".to_string());

        let out = instrumented_blocking(&telemetry, "sync.work", &[], || Ok::<_, Forced>(map))
            .unwrap();

        assert_eq!(out.len(), 2);
        let span = &telemetry.finished_spans()[0];
        assert_eq!(span.attribute(attributes::STATE_KEYS), Some(&Value::I64(2)));
        assert_eq!(span.attribute(attributes::STATE_SIZE), Some(&Value::I64(3)));
    }

    #[test]
    fn blocking_wrapper_propagates_errors() {
        let telemetry = Telemetry::in_memory();
        let err = instrumented_blocking(&telemetry, "sync.fail", &[], || {
            Err::<BTreeMap<String, String>, _>(Forced(1))
        })
        .unwrap_err();

        assert_eq!(err, Forced(1));
        assert!(telemetry.finished_spans()[0].is_error());
    }
}
