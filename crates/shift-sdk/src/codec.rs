//! Line-oriented message codec.
//!
//! One [`Message`] per line, JSON encoded. [`MessageWriter`] emits whole
//! lines with a single write so an interrupt can never leave a partial
//! message on the wire. [`LineDecoder`] pulls one unit at a time from an
//! async reader, so memory use is independent of the number of messages.

use std::collections::HashMap;
use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use shift_types::message::{Message, MessageKind};

use crate::error::{DecodeError, Result};

/// Encode a message as a single line (no trailing newline).
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(message: &Message) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode one protocol unit.
///
/// # Errors
///
/// Returns a [`DecodeError`] carrying the (truncated) offending input when
/// the line is not valid JSON or not a known message shape.
pub fn decode_line(line: &str) -> std::result::Result<Message, DecodeError> {
    serde_json::from_str(line.trim()).map_err(|e| DecodeError::new(e.to_string(), line))
}

/// Writes messages as newline-delimited JSON and counts them by kind.
pub struct MessageWriter<W> {
    inner: W,
    counts: HashMap<MessageKind, u64>,
}

impl<W: Write> MessageWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            counts: HashMap::new(),
        }
    }

    /// Serialize and write one message, then flush.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    pub fn emit(&mut self, message: &Message) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.inner.write_all(&line)?;
        self.inner.flush()?;
        *self.counts.entry(message.kind()).or_default() += 1;
        Ok(())
    }

    /// Number of messages of `kind` written so far.
    pub fn emitted(&self, kind: MessageKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Pulls protocol units from an async line source.
pub struct LineDecoder<R> {
    lines: Lines<R>,
    line_number: u64,
}

impl<R: AsyncBufRead + Unpin> LineDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    /// Next non-blank unit, decoded.
    ///
    /// Returns `Ok(None)` at end of input and `Ok(Some(Err(_)))` for a
    /// malformed unit; the caller decides whether that is fatal.
    ///
    /// # Errors
    ///
    /// Returns an error only if reading from the source fails.
    pub async fn next_unit(
        &mut self,
    ) -> std::io::Result<Option<std::result::Result<Message, DecodeError>>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(decode_line(&line)));
        }
        Ok(None)
    }

    /// Number of lines consumed, blank lines included.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

/// Decode every line of `output`, panicking on malformed units.
///
/// Intended for tests that inspect what a command wrote.
pub fn decode_all(output: &[u8]) -> Vec<Message> {
    String::from_utf8_lossy(output)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| decode_line(l).unwrap_or_else(|e| panic!("undecodable output line: {e}")))
        .collect()
}
