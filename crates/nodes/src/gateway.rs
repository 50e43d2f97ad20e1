//! The LLM gateway.
//!
//! Every model call made by a stage goes through [`LlmGateway::complete`]. The
//! gateway never fails: in stub mode it answers locally, and provider errors
//! are recorded on the call's span and replaced with fallback text.

use std::sync::Arc;

use llm::{fallback_response, stub_response};
use pipeline::{CompletionRequest, LlmProvider, OperationName};
use telemetry::conventions::attributes;
use telemetry::{KeyValue, LlmLabels, Status, Telemetry};
use tracing::{debug, warn, Instrument};

/// Wraps an optional provider with telemetry and error containment.
pub struct LlmGateway {
    provider: Option<Arc<dyn LlmProvider>>,
    max_tokens: u32,
    telemetry: Arc<Telemetry>,
}

impl LlmGateway {
    /// `provider` of `None` selects stub mode.
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        max_tokens: u32,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            provider,
            max_tokens,
            telemetry,
        }
    }

    /// A gateway that never contacts a provider.
    pub fn stub(telemetry: Arc<Telemetry>) -> Self {
        Self::new(None, llm::settings::DEFAULT_MAX_TOKENS, telemetry)
    }

    pub fn is_stub(&self) -> bool {
        self.provider.is_none()
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    /// Sends `prompt` and returns the completion text.
    ///
    /// Stub mode returns [`stub_response`] without opening a span. Otherwise
    /// one span named after `operation` covers the call; on failure it carries
    /// the exception and ERROR status, and the caller receives
    /// [`fallback_response`] text instead of an error.
    pub async fn complete(&self, prompt: &str, operation: &OperationName) -> String {
        let Some(provider) = &self.provider else {
            debug!(operation = %operation, "Stub completion");
            return stub_response(prompt);
        };

        let info = provider.info();
        let labels = LlmLabels::new(info.model.clone(), operation.clone());
        let mut span = self.telemetry.start_span(operation.as_str());
        span.set_attribute(KeyValue::new(attributes::LLM_SYSTEM, info.system));
        span.set_attribute(KeyValue::new(attributes::LLM_MODEL, info.model.to_string()));
        span.set_attribute(KeyValue::new(
            attributes::LLM_REQUEST_MAX_TOKENS,
            i64::from(self.max_tokens),
        ));
        span.set_attribute(KeyValue::new(
            attributes::LLM_REQUEST_PROMPT_LENGTH,
            char_count(prompt),
        ));
        for (key, value) in &info.attributes {
            span.set_attribute(KeyValue::new(*key, value.clone()));
        }

        let request = CompletionRequest::new(prompt, self.max_tokens);
        let result = provider
            .complete(&request)
            .instrument(span.tracing_span().clone())
            .await;

        let elapsed = span.elapsed_ms();
        span.set_attribute(KeyValue::new(attributes::DURATION_MS, elapsed));
        self.telemetry.record_duration(elapsed, &labels);

        match result {
            Ok(response) => {
                span.record_llm_response(&response, &labels);
                span.set_attribute(KeyValue::new(
                    attributes::LLM_RESPONSE_LENGTH,
                    char_count(&response.text),
                ));
                span.log_content(prompt, &response.text, None);
                span.set_status(Status::Ok);
                response.text
            }
            Err(e) => {
                warn!(operation = %operation, error = %e, "LLM call failed; using fallback text");
                span.record_exception(&e);
                span.set_status(Status::error(e.to_string()));
                fallback_response(&e)
            }
        }
    }
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("provider", &self.provider.as_ref().map(|p| p.info()))
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

fn char_count(text: &str) -> i64 {
    i64::try_from(text.chars().count()).unwrap_or(i64::MAX)
}
