//! Newtype domain identifiers.
//!
//! Every named concept that flows into span names or metric labels is a
//! distinct newtype wrapping a `String`. This keeps a [`ModelName`] from being
//! passed where an [`OperationName`] is expected even though both end up as
//! label values.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, from_static(), as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Creates an identifier from a non-empty literal.
            pub fn from_static(value: &'static str) -> Self {
                debug_assert!(!value.is_empty(), "identifiers must not be empty");
                Self(value.to_string())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single pipeline run (one pass through all four stages).
///
/// Generated fresh for every request and attached to every stage span so all
/// activity from one run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineRunId(Uuid);

impl PipelineRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PipelineRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a pipeline stage, and therefore the name of its span
    /// (e.g. `"planner.agent"`).
    StageName
}

string_id! {
    /// A model identifier as understood by the provider
    /// (e.g. `"openai/gpt-4o-mini"` or an Azure deployment name).
    ModelName
}

string_id! {
    /// Names one kind of model call for span naming and metric labelling
    /// (e.g. `"llm.completion.planner"`).
    OperationName
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_are_rejected() {
        assert!(StageName::new("").is_none());
        assert!(ModelName::new(String::new()).is_none());
    }

    #[test]
    fn names_display_their_value() {
        let name = OperationName::new("llm.completion.worker").unwrap();
        assert_eq!(name.to_string(), "llm.completion.worker");
        assert_eq!(name.as_str(), "llm.completion.worker");
    }

    #[test]
    fn static_names_match_checked_names() {
        assert_eq!(
            StageName::from_static("planner.agent"),
            StageName::new("planner.agent").unwrap()
        );
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(PipelineRunId::new_random(), PipelineRunId::new_random());
    }
}
