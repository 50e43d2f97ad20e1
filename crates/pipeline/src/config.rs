//! Parsing helpers for environment-style configuration.
//!
//! Configuration structs in the infrastructure crates read their settings
//! through a lookup function (`Fn(&str) -> Option<String>`) rather than
//! touching the process environment directly. The helpers here give every
//! crate the same rules for flags, numbers, and blank values.

use std::str::FromStr;

use thiserror::Error;

/// A configuration value could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The variable is set but its value is not valid for the setting.
    #[error("Invalid value '{value}' for {variable}: {reason}")]
    InvalidValue {
        /// Name of the configuration variable.
        variable: String,
        /// The raw value that was rejected.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Returns the trimmed value of `variable`, treating blank values as unset.
pub fn non_empty<F>(lookup: &F, variable: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(variable)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Returns `true` if `value` is one of `1`, `true`, `yes` (case-insensitive).
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Reads a boolean flag; unset or blank means `default`.
pub fn flag<F>(lookup: &F, variable: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, variable)
        .map(|v| is_truthy(&v))
        .unwrap_or(default)
}

/// Reads a number; unset or blank means `default`, anything unparsable is an error.
pub fn number<F, T>(lookup: &F, variable: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, variable) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            variable: variable.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
