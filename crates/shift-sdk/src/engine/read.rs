//! Read mode: driver events in, RECORD and STATE messages out.
//!
//! The driver and the consumer run concurrently on the same task over a
//! bounded channel, so a slow consumer backpressures the driver. Records
//! are emitted as they arrive. A STATE snapshot goes out whenever the
//! driver reports a state update and after every `batch_size` records.
//! Cursors only ever come from the driver: a count-based checkpoint
//! re-emits the latest reported position, never one read off a record.

use std::io::Write;

use serde_json::Value;
use tokio::sync::mpsc;

use shift_types::catalog::{ConfiguredCatalog, StreamDescriptor};
use shift_types::error::ConnectorError;
use shift_types::message::{LogLevel, Message};
use shift_types::record::Record;
use shift_types::state::{State, StateRegression, StreamState};

use crate::codec::{decode_line, MessageWriter};
use crate::config::RuntimeConfig;
use crate::connector::Reader;
use crate::error::{Result, ShiftError};

use super::{catch_panic, ReadSummary};

/// Cursor position a driver reports for one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub stream: StreamDescriptor,
    pub cursor_field: Option<String>,
    pub cursor: Value,
}

/// One item of a driver's output sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadEvent {
    Record(Record),
    State(StateUpdate),
    /// An encoded protocol unit, decoded by the engine.
    Raw(String),
    Log(LogLevel, String),
}

/// Driver-side handle onto the read channel.
#[derive(Debug, Clone)]
pub struct ReadEmitter {
    tx: mpsc::Sender<ReadEvent>,
}

impl ReadEmitter {
    pub(crate) fn new(tx: mpsc::Sender<ReadEvent>) -> Self {
        Self { tx }
    }

    /// Channel pair for driving a read engine by hand.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ReadEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Send one event, waiting for channel capacity.
    ///
    /// # Errors
    ///
    /// Fails with an `EMITTER_CLOSED` internal error once the engine has
    /// stopped consuming; the driver should return.
    pub async fn emit(&self, event: ReadEvent) -> std::result::Result<(), ConnectorError> {
        self.tx.send(event).await.map_err(|_| {
            ConnectorError::internal("EMITTER_CLOSED", "read engine stopped consuming events")
        })
    }

    pub async fn record(&self, record: Record) -> std::result::Result<(), ConnectorError> {
        self.emit(ReadEvent::Record(record)).await
    }

    pub async fn state(
        &self,
        stream: StreamDescriptor,
        cursor_field: Option<&str>,
        cursor: Value,
    ) -> std::result::Result<(), ConnectorError> {
        self.emit(ReadEvent::State(StateUpdate {
            stream,
            cursor_field: cursor_field.map(str::to_string),
            cursor,
        }))
        .await
    }

    pub async fn raw(&self, line: impl Into<String>) -> std::result::Result<(), ConnectorError> {
        self.emit(ReadEvent::Raw(line.into())).await
    }

    pub async fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
    ) -> std::result::Result<(), ConnectorError> {
        self.emit(ReadEvent::Log(level, message.into())).await
    }
}

/// Tracks cursor state and decides when to checkpoint.
pub struct CheckpointEngine {
    state: State,
    batch_size: usize,
    since_checkpoint: usize,
    emitted_state: bool,
    summary: ReadSummary,
}

impl CheckpointEngine {
    pub fn new(state: State, batch_size: usize) -> Self {
        Self {
            state,
            batch_size: batch_size.max(1),
            since_checkpoint: 0,
            emitted_state: false,
            summary: ReadSummary::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Process one driver event.
    ///
    /// # Errors
    ///
    /// Fails only when writing to `out` fails.
    pub fn handle<W: Write>(&mut self, event: ReadEvent, out: &mut MessageWriter<W>) -> Result<()> {
        match event {
            ReadEvent::Record(record) => self.on_record(record, out),
            ReadEvent::State(update) => self.on_state(vec![update], out),
            ReadEvent::Raw(line) => self.on_raw(&line, out),
            ReadEvent::Log(level, message) => out.emit(&Message::log(level, message)),
        }
    }

    fn on_record<W: Write>(&mut self, record: Record, out: &mut MessageWriter<W>) -> Result<()> {
        out.emit(&Message::from(record))?;
        self.summary.records += 1;
        self.since_checkpoint += 1;
        if self.since_checkpoint >= self.batch_size {
            self.checkpoint(out)?;
        }
        Ok(())
    }

    fn on_state<W: Write>(
        &mut self,
        updates: Vec<StateUpdate>,
        out: &mut MessageWriter<W>,
    ) -> Result<()> {
        let proposed = updates.len();
        let mut rejected = 0;
        for update in updates {
            if let Err(regression) =
                self.state
                    .advance(&update.stream, update.cursor_field.as_deref(), update.cursor)
            {
                self.reject(&regression);
                rejected += 1;
            }
        }
        if proposed > 0 && rejected == proposed {
            return Ok(());
        }
        self.checkpoint(out)
    }

    fn reject(&mut self, regression: &StateRegression) {
        tracing::warn!(
            stream = %regression.stream,
            held = %regression.held,
            proposed = %regression.proposed,
            "Rejected regressing state update"
        );
        self.summary.rejected_states += 1;
    }

    fn on_raw<W: Write>(&mut self, line: &str, out: &mut MessageWriter<W>) -> Result<()> {
        match decode_line(line) {
            Ok(Message::Record { record }) => self.on_record(record, out),
            Ok(Message::State { state }) => {
                let updates = state
                    .streams
                    .into_iter()
                    .map(|StreamState { stream, cursor_field, cursor }| StateUpdate {
                        stream,
                        cursor_field,
                        cursor,
                    })
                    .collect();
                self.on_state(updates, out)
            }
            Ok(message @ Message::Log { .. }) => out.emit(&message),
            Ok(other) => {
                tracing::debug!(kind = %other.kind(), "Ignoring unit from driver");
                Ok(())
            }
            Err(err) => {
                self.summary.decode_errors += 1;
                tracing::warn!(reason = %err.reason, raw = %err.raw, "Skipping malformed unit");
                let err = ShiftError::ProtocolDecode(err);
                out.emit(&Message::log(LogLevel::Warn, err.to_string()))
            }
        }
    }

    fn checkpoint<W: Write>(&mut self, out: &mut MessageWriter<W>) -> Result<()> {
        out.emit(&Message::from(self.state.clone()))?;
        self.summary.checkpoints += 1;
        self.since_checkpoint = 0;
        self.emitted_state = true;
        Ok(())
    }

    /// Emit the closing checkpoint, if one is due, and return the counters.
    ///
    /// # Errors
    ///
    /// Fails only when writing to `out` fails.
    pub fn finish<W: Write>(mut self, out: &mut MessageWriter<W>) -> Result<ReadSummary> {
        if self.since_checkpoint > 0 || !self.emitted_state {
            self.checkpoint(out)?;
        }
        Ok(self.summary)
    }
}

/// Run a driver's `read` to completion, emitting its output on `out`.
///
/// # Errors
///
/// Returns the driver's error (after everything it sent before failing has
/// been emitted, without a closing checkpoint), a caught panic, or an
/// output failure.
pub async fn run_read<R: Reader, W: Write>(
    reader: &R,
    config: &R::Config,
    catalog: &ConfiguredCatalog,
    state: &State,
    runtime: &RuntimeConfig,
    out: &mut MessageWriter<W>,
) -> Result<ReadSummary> {
    let (emitter, mut rx) = ReadEmitter::channel(runtime.channel_capacity.get());
    let mut engine = CheckpointEngine::new(state.clone(), runtime.batch_size.get());

    tracing::info!(
        streams = catalog.streams.len(),
        batch_size = runtime.batch_size.get(),
        "Starting read"
    );

    let consumer = &mut engine;
    let sink = &mut *out;
    let (produced, consumed) = tokio::join!(
        catch_panic(reader.read(config, catalog, state, emitter)),
        async move {
            while let Some(event) = rx.recv().await {
                consumer.handle(event, sink)?;
            }
            Ok::<(), ShiftError>(())
        }
    );
    consumed?;
    if let Err(err) = produced {
        tracing::error!(
            records = engine.summary.records,
            checkpoints = engine.summary.checkpoints,
            "Read failed: {}",
            err
        );
        return Err(err);
    }

    let summary = engine.finish(out)?;
    tracing::info!(
        records = summary.records,
        checkpoints = summary.checkpoints,
        decode_errors = summary.decode_errors,
        rejected_states = summary.rejected_states,
        "Read complete"
    );
    Ok(summary)
}
