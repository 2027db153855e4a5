//! Structured error model for connector capabilities.
//!
//! [`ConnectorError`] carries a category, a stable code, and optional
//! diagnostic details. Construct via category-specific factory methods.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::message::FailureType;

/// Broad classification of a connector error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid connector configuration.
    Config,
    /// Specification could not be produced or config failed schema validation.
    Validation,
    /// External system unreachable or refused the connection.
    Connectivity,
    /// Stream enumeration failed.
    Discovery,
    /// Invalid or corrupt data.
    Data,
    /// Destination rejected a batch.
    Write,
    /// Internal connector error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Validation => "validation",
            Self::Connectivity => "connectivity",
            Self::Discovery => "discovery",
            Self::Data => "data",
            Self::Write => "write",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl ErrorCategory {
    /// Failure type reported in a TRACE message for this category.
    #[must_use]
    pub fn failure_type(self) -> FailureType {
        match self {
            Self::Config | Self::Validation => FailureType::ConfigError,
            Self::Connectivity => FailureType::TransientError,
            Self::Discovery | Self::Data | Self::Write | Self::Internal => FailureType::SystemError,
        }
    }
}

/// Structured error from a connector capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("[{category}] {code}: {message}")]
pub struct ConnectorError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ConnectorError {
    fn new(
        category: ErrorCategory,
        retryable: bool,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            retryable,
            details: None,
        }
    }

    /// Configuration error (not retryable).
    #[must_use]
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Config, false, code, message)
    }

    /// Specification or schema validation error (not retryable).
    #[must_use]
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, false, code, message)
    }

    /// Connectivity error (retryable).
    #[must_use]
    pub fn connectivity(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Connectivity, true, code, message)
    }

    /// Discovery error (not retryable).
    #[must_use]
    pub fn discovery(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Discovery, false, code, message)
    }

    /// Data error (not retryable).
    #[must_use]
    pub fn data(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Data, false, code, message)
    }

    /// Destination write error (retryable; the caller owns retry policy).
    #[must_use]
    pub fn write(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Write, true, code, message)
    }

    /// Internal connector error (not retryable).
    #[must_use]
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, false, code, message)
    }

    /// Attach structured diagnostic details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Override the default retryability.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}
