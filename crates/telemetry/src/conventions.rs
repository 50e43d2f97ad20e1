//! Attribute, event, and metric names shared by every span and instrument.
//!
//! Keeping the schema in one place is what makes spans from different stages
//! comparable in a trace backend.

/// Span attribute keys.
pub mod attributes {
    // Wrapped-call results
    pub const STATE_KEYS: &str = "state.keys";
    pub const STATE_SIZE: &str = "state.size";
    pub const DURATION_MS: &str = "duration_ms";

    // Run correlation
    pub const PIPELINE_RUN_ID: &str = "pipeline.run_id";
    pub const PIPELINE_STAGE_INDEX: &str = "pipeline.stage_index";

    // Model call request
    pub const LLM_SYSTEM: &str = "llm.system";
    pub const LLM_MODEL: &str = "llm.model";
    pub const LLM_REQUEST_MAX_TOKENS: &str = "llm.request.max_tokens";
    pub const LLM_REQUEST_PROMPT_LENGTH: &str = "llm.request.prompt_length";

    // Model call response
    pub const LLM_RESPONSE_LENGTH: &str = "llm.response.length";
    pub const LLM_RESPONSE_FINISH_REASON: &str = "llm.response.finish_reason";
    pub const LLM_RESPONSE_MODEL: &str = "llm.response.model";
    pub const LLM_USAGE_INPUT_TOKENS: &str = "llm.usage.input_tokens";
    pub const LLM_USAGE_OUTPUT_TOKENS: &str = "llm.usage.output_tokens";
    pub const LLM_USAGE_TOTAL_TOKENS: &str = "llm.usage.total_tokens";

    // Exception events
    pub const EXCEPTION_TYPE: &str = "exception.type";
    pub const EXCEPTION_MESSAGE: &str = "exception.message";

    // Content events
    pub const LLM_PROMPT: &str = "llm.prompt";
    pub const LLM_COMPLETION: &str = "llm.completion";
    pub const CONTENT_TRUNCATED: &str = "truncated";
    pub const CONTENT_ORIGINAL_LENGTH: &str = "original_length";

    // Resource
    pub const SERVICE_NAME: &str = "service.name";
    pub const SERVICE_VERSION: &str = "service.version";
    pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";
}

/// Span event names.
pub mod events {
    pub const EXCEPTION: &str = "exception";
    pub const LLM_PROMPT: &str = "llm.prompt";
    pub const LLM_COMPLETION: &str = "llm.completion";
}

/// Metric instrument names and their labels.
pub mod metrics {
    pub const METER_NAME: &str = "quartet";

    pub const TOKENS: &str = "llm.tokens";
    pub const OPERATION_DURATION: &str = "llm.operation.duration";

    // Labels
    pub const TOKEN_DIRECTION: &str = "token.direction";
    pub const MODEL: &str = "llm.model";
    pub const OPERATION: &str = "llm.operation";
}

/// Metric units following OpenTelemetry conventions.
pub mod units {
    pub const TOKENS: &str = "{token}";
    pub const MILLISECONDS: &str = "ms";
}
