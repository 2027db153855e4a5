//! The line-oriented message envelope exchanged over the process boundary.
//!
//! Every [`Message`] serializes to one JSON object with a `"type"`
//! discriminator and a single payload field named after the kind:
//!
//! ```text
//! {"type":"RECORD","record":{"stream":"users","emitted_at":1700000000000,"data":{"id":1}}}
//! {"type":"STATE","state":{"streams":[...]}}
//! {"type":"CONNECTION_STATUS","connectionStatus":{"status":"SUCCEEDED"}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::record::Record;
use crate::state::State;
use crate::wire::{ConnectionStatus, ConnectorSpecification};

/// Severity of a LOG message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
}

/// Coarse failure classification reported in a TRACE message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    /// The caller supplied bad input; retrying unchanged will fail again.
    ConfigError,
    /// Connector or runtime fault.
    SystemError,
    /// Likely to succeed on retry.
    TransientError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTrace {
    /// Operator-facing summary.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_message: Option<String>,
    pub failure_type: FailureType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceMessage {
    pub emitted_at: i64,
    pub error: ErrorTrace,
}

/// Discriminator of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Record,
    State,
    Log,
    Catalog,
    Spec,
    ConnectionStatus,
    Trace,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Record => "RECORD",
            Self::State => "STATE",
            Self::Log => "LOG",
            Self::Catalog => "CATALOG",
            Self::Spec => "SPEC",
            Self::ConnectionStatus => "CONNECTION_STATUS",
            Self::Trace => "TRACE",
        };
        f.write_str(s)
    }
}

/// Tagged union of everything that crosses the process boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    Record {
        record: Record,
    },
    State {
        state: State,
    },
    Log {
        log: LogMessage,
    },
    Catalog {
        catalog: Catalog,
    },
    Spec {
        spec: ConnectorSpecification,
    },
    ConnectionStatus {
        #[serde(rename = "connectionStatus")]
        connection_status: ConnectionStatus,
    },
    Trace {
        trace: TraceMessage,
    },
}

impl Message {
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Record { .. } => MessageKind::Record,
            Self::State { .. } => MessageKind::State,
            Self::Log { .. } => MessageKind::Log,
            Self::Catalog { .. } => MessageKind::Catalog,
            Self::Spec { .. } => MessageKind::Spec,
            Self::ConnectionStatus { .. } => MessageKind::ConnectionStatus,
            Self::Trace { .. } => MessageKind::Trace,
        }
    }

    #[must_use]
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            log: LogMessage {
                level,
                message: message.into(),
            },
        }
    }

    /// TRACE message for a failure, stamped with the current time.
    #[must_use]
    pub fn error_trace(
        failure_type: FailureType,
        message: impl Into<String>,
        internal_message: Option<String>,
    ) -> Self {
        Self::Trace {
            trace: TraceMessage {
                emitted_at: chrono::Utc::now().timestamp_millis(),
                error: ErrorTrace {
                    message: message.into(),
                    internal_message,
                    failure_type,
                    stack_trace: None,
                },
            },
        }
    }
}

impl From<Record> for Message {
    fn from(record: Record) -> Self {
        Self::Record { record }
    }
}

impl From<State> for Message {
    fn from(state: State) -> Self {
        Self::State { state }
    }
}

impl From<Catalog> for Message {
    fn from(catalog: Catalog) -> Self {
        Self::Catalog { catalog }
    }
}

impl From<ConnectorSpecification> for Message {
    fn from(spec: ConnectorSpecification) -> Self {
        Self::Spec { spec }
    }
}

impl From<ConnectionStatus> for Message {
    fn from(connection_status: ConnectionStatus) -> Self {
        Self::ConnectionStatus { connection_status }
    }
}
