//! Command-boundary error model.
//!
//! [`ShiftError`] is what every runtime entry point returns. Capability
//! failures arrive wrapped as [`ShiftError::Connector`]; everything else is
//! raised by the runtime itself. At the command boundary each error becomes
//! a LOG and a TRACE message (see [`ShiftError::to_trace`]).

use shift_types::catalog::StreamDescriptor;
use shift_types::error::ConnectorError;
use shift_types::message::{FailureType, Message};
use shift_types::wire::ConnectorRole;

use crate::command::Command;

/// Process exit code for a command that reached its terminal state.
pub const EXIT_OK: u8 = 0;
/// Process exit code for a failed command.
pub const EXIT_FAILURE: u8 = 1;
/// Process exit code after an external interrupt.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Longest raw-input excerpt kept in a [`DecodeError`].
pub const MAX_RAW_EXCERPT_BYTES: usize = 256;

/// A protocol unit that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed protocol message ({reason}): {raw}")]
pub struct DecodeError {
    pub reason: String,
    /// Offending input, truncated to [`MAX_RAW_EXCERPT_BYTES`].
    pub raw: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            raw: truncate(raw, MAX_RAW_EXCERPT_BYTES),
        }
    }
}

fn truncate(raw: &str, max_bytes: usize) -> String {
    if raw.len() <= max_bytes {
        return raw.to_string();
    }
    let mut end = max_bytes;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &raw[..end])
}

/// A batch the destination rejected. Its records are not retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("flush of {lost} record(s) for stream '{stream}' failed: {cause}")]
pub struct WriteError {
    pub stream: StreamDescriptor,
    pub lost: usize,
    pub cause: ConnectorError,
}

#[derive(Debug, thiserror::Error)]
pub enum ShiftError {
    #[error("missing required argument --{argument}")]
    MissingArgument { argument: &'static str },

    #[error("command '{command}' is not available to {role} connectors")]
    UnsupportedCommand {
        command: Command,
        role: ConnectorRole,
    },

    #[error(transparent)]
    ProtocolDecode(#[from] DecodeError),

    #[error("invalid --{argument} payload: {reason}")]
    InvalidInput {
        argument: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("write finished with failed flushes for stream(s): {}", lost_per_stream(.failures))]
    PartialWrite { failures: Vec<WriteError> },

    #[error("record references stream '{stream}' which is not in the configured catalog")]
    UnknownStream { stream: StreamDescriptor },

    #[error("connector panicked: {message}")]
    Panic { message: String },

    #[error("interrupted before the command completed")]
    Interrupted,

    #[error("this runtime has already executed a command")]
    AlreadyTerminated,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// `stream (N lost)` per failed stream, in order of first failure.
fn lost_per_stream(failures: &[WriteError]) -> String {
    let mut streams: Vec<(&StreamDescriptor, usize)> = Vec::new();
    for failure in failures {
        match streams.iter_mut().find(|(stream, _)| **stream == failure.stream) {
            Some((_, lost)) => *lost += failure.lost,
            None => streams.push((&failure.stream, failure.lost)),
        }
    }
    streams
        .iter()
        .map(|(stream, lost)| format!("{stream} ({lost} lost)"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ShiftError>;

impl ShiftError {
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::MissingArgument { .. }
            | Self::UnsupportedCommand { .. }
            | Self::ProtocolDecode(_)
            | Self::InvalidInput { .. }
            | Self::UnknownStream { .. } => FailureType::ConfigError,
            Self::Connector(e) => e.category.failure_type(),
            Self::Interrupted => FailureType::TransientError,
            Self::PartialWrite { .. }
            | Self::Panic { .. }
            | Self::AlreadyTerminated
            | Self::Io(_)
            | Self::Serialize(_) => FailureType::SystemError,
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }

    /// TRACE message describing this error.
    pub fn to_trace(&self) -> Message {
        let internal = match self {
            Self::Connector(e) => e.details.as_ref().map(ToString::to_string),
            Self::PartialWrite { failures } => Some(
                failures
                    .iter()
                    .map(|f| format!("{}: {}", f.stream, f.cause))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => None,
        };
        Message::error_trace(self.failure_type(), self.to_string(), internal)
    }
}
