//! Runtime settings and connector config decoding.

use std::num::NonZeroUsize;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

/// Records per batch (write) or between count-based checkpoints (read).
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Capacity of the channel between a driver and the read engine.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Knobs the command machine and engines read. Built once at startup and
/// passed down explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub batch_size: NonZeroUsize,
    pub channel_capacity: NonZeroUsize,
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            channel_capacity: NonZeroUsize::new(DEFAULT_CHANNEL_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Why a raw config payload could not become a connector config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigDecodeError {
    #[error("Missing environment variable(s): {}", .0.join(", "))]
    MissingEnvVars(Vec<String>),
    #[error("config is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("config must be a JSON object")]
    NotAnObject,
    #[error("config does not match the connector schema: {0}")]
    Schema(#[source] serde_json::Error),
}

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns [`ConfigDecodeError::MissingEnvVars`] listing every referenced
/// variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigDecodeError> {
    let mut missing = Vec::new();
    let substituted = ENV_VAR_RE.replace_all(input, |cap: &regex::Captures<'_>| {
        std::env::var(&cap[1]).unwrap_or_else(|_| {
            missing.push(cap[1].to_string());
            String::new()
        })
    });
    if !missing.is_empty() {
        return Err(ConfigDecodeError::MissingEnvVars(missing));
    }
    Ok(substituted.into_owned())
}

/// Turn a raw config payload into the connector's config type.
///
/// # Errors
///
/// Fails on unresolved environment references, invalid JSON, a payload that
/// is not an object, or one the connector's config type rejects.
pub fn decode_config<C: DeserializeOwned>(raw: &str) -> Result<C, ConfigDecodeError> {
    let substituted = substitute_env_vars(raw)?;
    let value: serde_json::Value =
        serde_json::from_str(&substituted).map_err(ConfigDecodeError::Syntax)?;
    if !value.is_object() {
        return Err(ConfigDecodeError::NotAnObject);
    }
    serde_json::from_value(value).map_err(ConfigDecodeError::Schema)
}
