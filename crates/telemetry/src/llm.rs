//! Model-call recorders: response metadata, token metrics, and content events.

use opentelemetry::KeyValue;
use pipeline::CompletionResponse;

use crate::conventions::{attributes, events};
use crate::span::count_value;
use crate::{LlmLabels, ScopedSpan};

impl ScopedSpan<'_> {
    /// Records what `response` reports about itself.
    ///
    /// Token counts become span attributes and are added to the token counter
    /// under `labels`; finish reason and serving model become attributes.
    /// Anything the provider did not report is skipped.
    pub fn record_llm_response(&mut self, response: &CompletionResponse, labels: &LlmLabels) {
        let usage = response.usage;
        if let Some(input) = usage.input {
            self.set_attribute(KeyValue::new(
                attributes::LLM_USAGE_INPUT_TOKENS,
                count_value(input.as_u64()),
            ));
        }
        if let Some(output) = usage.output {
            self.set_attribute(KeyValue::new(
                attributes::LLM_USAGE_OUTPUT_TOKENS,
                count_value(output.as_u64()),
            ));
        }
        if let Some(total) = usage.total() {
            self.set_attribute(KeyValue::new(
                attributes::LLM_USAGE_TOTAL_TOKENS,
                count_value(total.as_u64()),
            ));
        }

        let telemetry = self.telemetry();
        for (direction, count) in usage.by_direction() {
            telemetry.add_tokens(direction, count, labels);
        }

        if let Some(reason) = &response.finish_reason {
            self.set_attribute(KeyValue::new(
                attributes::LLM_RESPONSE_FINISH_REASON,
                reason.clone(),
            ));
        }
        if let Some(model) = &response.model {
            self.set_attribute(KeyValue::new(attributes::LLM_RESPONSE_MODEL, model.clone()));
        }
    }

    /// Adds `llm.prompt` and `llm.completion` events carrying the texts.
    ///
    /// `enabled` overrides the configured default. Each text is cut to the
    /// configured maximum number of characters; the event's `truncated`
    /// attribute says whether that happened.
    pub fn log_content(&mut self, prompt: &str, completion: &str, enabled: Option<bool>) {
        let config = self.telemetry().config();
        if !enabled.unwrap_or(config.log_content) {
            return;
        }
        let max = config.max_content_length;
        self.add_content_event(events::LLM_PROMPT, attributes::LLM_PROMPT, prompt, max);
        self.add_content_event(
            events::LLM_COMPLETION,
            attributes::LLM_COMPLETION,
            completion,
            max,
        );
    }

    fn add_content_event(
        &mut self,
        event: &'static str,
        key: &'static str,
        text: &str,
        max_chars: usize,
    ) {
        let (kept, truncated) = truncate_chars(text, max_chars);
        self.add_event(
            event,
            vec![
                KeyValue::new(key, kept.to_string()),
                KeyValue::new(attributes::CONTENT_TRUNCATED, truncated),
                KeyValue::new(
                    attributes::CONTENT_ORIGINAL_LENGTH,
                    count_value(text.chars().count()),
                ),
            ],
        );
    }
}

/// Returns the first `max_chars` characters of `text` and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (&text[..byte_index], true),
        None => (text, false),
    }
}
