//! The state mapping threaded through the pipeline.
//!
//! A [`PipelineState`] starts with the caller's `task` and gains exactly one
//! key per stage. Keys are never rewritten; a second write to the same key is
//! a [`PipelineError::StateKeyOverwrite`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PipelineError;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// The fixed set of keys a [`PipelineState`] may hold.
///
/// Declaration order is pipeline order, so iterating a state yields keys in
/// the order the stages write them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    /// The caller's task description (initial input).
    Task,
    /// Written by the planner stage.
    Plan,
    /// Written by the worker stage.
    Work,
    /// Written by the reflection stage.
    Reflection,
    /// Written by the reviewer stage; the final output.
    Review,
}

impl StateKey {
    /// Every key, in pipeline order.
    pub const ALL: [StateKey; 5] = [
        StateKey::Task,
        StateKey::Plan,
        StateKey::Work,
        StateKey::Reflection,
        StateKey::Review,
    ];

    /// Returns the wire name of the key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Plan => "plan",
            Self::Work => "work",
            Self::Reflection => "reflection",
            Self::Review => "review",
        }
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Accumulating key/value record passed from stage to stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineState(BTreeMap<StateKey, String>);

impl PipelineState {
    /// Creates the initial state for a run holding only `task`.
    pub fn new(task: impl Into<String>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(StateKey::Task, task.into());
        Self(values)
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: StateKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    /// Returns the value stored under `key`, or a
    /// [`PipelineError::MissingStateKey`] naming the reading `stage`.
    pub fn require(&self, key: StateKey, stage: &str) -> Result<&str, PipelineError> {
        self.get(key).ok_or_else(|| PipelineError::MissingStateKey {
            stage: stage.to_string(),
            key,
        })
    }

    /// Writes `value` under `key`.
    ///
    /// Fails with [`PipelineError::StateKeyOverwrite`] if the key is already
    /// present; the existing value is left untouched.
    pub fn insert(&mut self, key: StateKey, value: impl Into<String>) -> Result<(), PipelineError> {
        if self.0.contains_key(&key) {
            return Err(PipelineError::StateKeyOverwrite { key });
        }
        self.0.insert(key, value.into());
        Ok(())
    }

    /// Returns `true` if `key` has been written.
    pub fn contains(&self, key: StateKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Number of keys written so far.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no key has been written.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of the character lengths of every stored value.
    pub fn total_value_chars(&self) -> usize {
        self.0.values().map(|v| v.chars().count()).sum()
    }

    /// Iterates over the stored entries in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (StateKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}
