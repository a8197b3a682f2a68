//! Configuration loading helpers
//!
//! Services resolve their settings with a two-tier priority:
//! environment variable (highest) then TOML config file, falling back
//! to compiled defaults. This module holds the shared plumbing; each
//! service defines its own typed config on top of it.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Load a TOML config file into a deserializable type.
///
/// A missing file is not an error: the type's `Default` is returned so
/// a service can run from environment variables alone.
pub fn load_toml<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Read a string setting from the environment.
///
/// Empty values are treated as unset.
pub fn env_string(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Read an integer setting from the environment.
///
/// Unparseable values are logged and treated as unset rather than
/// aborting startup.
pub fn env_u64(name: &str) -> Option<u64> {
    let raw = env_string(name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring non-numeric environment setting");
            None
        }
    }
}

/// Read a boolean setting from the environment.
///
/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` (case-insensitive).
pub fn env_bool(name: &str) -> Option<bool> {
    let raw = env_string(name)?;
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        other => {
            tracing::warn!(var = name, value = other, "Ignoring non-boolean environment setting");
            None
        }
    }
}
