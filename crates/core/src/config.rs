//! Helpers for reading typed configuration values from the environment.
//!
//! Every crate builds its own `from_env()` constructor on top of these,
//! so a malformed variable is reported the same way everywhere instead
//! of panicking at startup.

use std::str::FromStr;

use crate::error::CoreError;

/// Read `key` from the environment and parse it, falling back to
/// `default` when the variable is unset or empty.
pub fn env_or<T>(key: &'static str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(key, &raw),
        _ => Ok(default),
    }
}

/// Read `key` from the environment as a string, with a default.
pub fn env_string_or(key: &'static str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse a raw value for `key`, mapping parse failures to
/// [`CoreError::InvalidEnv`].
pub fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| CoreError::InvalidEnv {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
