//! Core protocol types shared across the runtime/connector boundary.
//!
//! Sync modes, connector roles, the connector self-description returned by
//! `spec`, and the connection status returned by `check`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How data is read from a source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Full read of all records on every run.
    FullRefresh,
    /// Cursor-based reads since the last checkpoint.
    Incremental,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullRefresh => f.write_str("full_refresh"),
            Self::Incremental => f.write_str("incremental"),
        }
    }
}

/// How records are applied at the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationSyncMode {
    /// Insert all records.
    #[default]
    Append,
    /// Replace the destination stream contents each run.
    Overwrite,
    /// Append and deduplicate by primary key.
    AppendDedup,
}

/// Role a connector fulfills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorRole {
    /// Reads data from an external system.
    Driver,
    /// Writes data to an external system.
    Adapter,
}

impl fmt::Display for ConnectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver => f.write_str("driver"),
            Self::Adapter => f.write_str("adapter"),
        }
    }
}

/// Connector self-description returned by the `spec` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSpecification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    /// JSON schema describing the connector's config payload.
    pub connection_specification: serde_json::Value,
    #[serde(default)]
    pub supports_incremental: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_destination_sync_modes: Vec<DestinationSyncMode>,
}

/// Outcome of a connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Succeeded,
    Failed,
}

/// Result of the `check` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: Status,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ConnectionStatus {
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            status: Status::Succeeded,
            message: String::new(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Status::Succeeded
    }
}
