//! Write mode: protocol units in, per-stream batches out to a sink.
//!
//! Records are buffered per stream and flushed once a buffer reaches the
//! batch size. A STATE unit is a barrier: every buffer is flushed before the
//! STATE is echoed, so an echoed STATE never covers unwritten records.

use std::io::Write;

use tokio::io::AsyncBufRead;

use shift_types::catalog::{ConfiguredCatalog, StreamDescriptor};
use shift_types::message::{LogLevel, Message};
use shift_types::record::Record;
use shift_types::state::State;

use crate::codec::{LineDecoder, MessageWriter};
use crate::config::RuntimeConfig;
use crate::connector::{WriteSink, Writer};
use crate::error::{Result, ShiftError, WriteError};

use super::{catch_panic, WriteSummary};

/// A stream's buffered records, ready to flush.
pub type Batch = (StreamDescriptor, Vec<Record>);

/// Per-stream record buffers, kept in first-seen stream order.
#[derive(Debug)]
pub struct WriteBatcher {
    batch_size: usize,
    buffers: Vec<Batch>,
}

impl WriteBatcher {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            buffers: Vec::new(),
        }
    }

    /// Buffer `record`; returns its stream's batch once it is full.
    pub fn push(&mut self, record: Record) -> Option<Batch> {
        let descriptor = record.descriptor();
        let index = match self.buffers.iter().position(|(d, _)| *d == descriptor) {
            Some(index) => index,
            None => {
                self.buffers.push((descriptor, Vec::new()));
                self.buffers.len() - 1
            }
        };
        let (descriptor, buffer) = &mut self.buffers[index];
        buffer.push(record);
        if buffer.len() < self.batch_size {
            return None;
        }
        Some((descriptor.clone(), std::mem::take(buffer)))
    }

    /// Take every non-empty buffer, in first-seen order.
    pub fn drain(&mut self) -> Vec<Batch> {
        self.buffers
            .iter_mut()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(descriptor, buffer)| (descriptor.clone(), std::mem::take(buffer)))
            .collect()
    }

    /// Records buffered and not yet flushed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffers.iter().map(|(_, buffer)| buffer.len()).sum()
    }
}

struct WriteRun<'a, S, W> {
    catalog: &'a ConfiguredCatalog,
    sink: S,
    out: &'a mut MessageWriter<W>,
    batcher: WriteBatcher,
    failures: Vec<WriteError>,
    summary: WriteSummary,
}

impl<S: WriteSink, W: Write> WriteRun<'_, S, W> {
    async fn on_record(&mut self, record: Record) -> Result<()> {
        let descriptor = record.descriptor();
        if self.catalog.find(&descriptor).is_none() {
            return Err(ShiftError::UnknownStream { stream: descriptor });
        }
        self.summary.records_received += 1;
        if let Some(batch) = self.batcher.push(record) {
            self.flush(batch).await?;
        }
        Ok(())
    }

    async fn on_state(&mut self, state: State) -> Result<()> {
        self.flush_all().await?;
        if self.failures.is_empty() {
            self.out.emit(&Message::from(state))?;
            self.summary.states_echoed += 1;
        } else {
            tracing::warn!(
                failed_flushes = self.failures.len(),
                "Withholding state: earlier flushes failed"
            );
        }
        Ok(())
    }

    async fn flush_all(&mut self) -> Result<()> {
        for batch in self.batcher.drain() {
            self.flush(batch).await?;
        }
        Ok(())
    }

    async fn flush(&mut self, (descriptor, records): Batch) -> Result<()> {
        let catalog = self.catalog;
        let Some(configured) = catalog.find(&descriptor) else {
            return Err(ShiftError::UnknownStream { stream: descriptor });
        };
        let lost = records.len();
        match catch_panic(self.sink.flush(configured, records)).await {
            Ok(ack) => {
                self.summary.batches += 1;
                self.summary.records_written += ack.records_written;
                tracing::debug!(
                    stream = %descriptor,
                    records = ack.records_written,
                    "Flushed batch"
                );
                Ok(())
            }
            Err(ShiftError::Connector(cause)) => {
                let err = WriteError {
                    stream: descriptor.clone(),
                    lost,
                    cause,
                };
                tracing::error!(stream = %descriptor, lost, "{}", err);
                self.out.emit(&Message::log(LogLevel::Error, err.to_string()))?;
                self.summary.failed_batches += 1;
                self.failures.push(err);
                Ok(())
            }
            Err(other) => Err(other),
        }
    }
}

/// Feed protocol units from `input` through an adapter's sink.
///
/// # Errors
///
/// A malformed unit or a record for an unconfigured stream ends the run
/// immediately, abandoning buffered records. Failed flushes do not stop
/// other streams; they surface as [`ShiftError::PartialWrite`] once the
/// input is exhausted.
pub async fn run_write<D, R, W>(
    writer: &D,
    config: &D::Config,
    catalog: &ConfiguredCatalog,
    input: R,
    runtime: &RuntimeConfig,
    out: &mut MessageWriter<W>,
) -> Result<WriteSummary>
where
    D: Writer,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let sink = catch_panic(writer.open(config, catalog)).await?;
    let mut run = WriteRun {
        catalog,
        sink,
        out,
        batcher: WriteBatcher::new(runtime.batch_size.get()),
        failures: Vec::new(),
        summary: WriteSummary::default(),
    };

    tracing::info!(
        streams = catalog.streams.len(),
        batch_size = runtime.batch_size.get(),
        "Starting write"
    );

    let mut decoder = LineDecoder::new(input);
    while let Some(unit) = decoder.next_unit().await? {
        match unit? {
            Message::Record { record } => run.on_record(record).await?,
            Message::State { state } => run.on_state(state).await?,
            message @ Message::Log { .. } => run.out.emit(&message)?,
            other => {
                tracing::debug!(
                    kind = %other.kind(),
                    line = decoder.line_number(),
                    "Ignoring unit on write input"
                );
            }
        }
    }

    run.flush_all().await?;
    catch_panic(run.sink.close()).await?;

    let summary = run.summary;
    tracing::info!(
        received = summary.records_received,
        written = summary.records_written,
        batches = summary.batches,
        failed_batches = summary.failed_batches,
        "Write complete"
    );

    if !run.failures.is_empty() {
        return Err(ShiftError::PartialWrite {
            failures: run.failures,
        });
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(stream: &str, id: i64) -> Record {
        let data = json!({"id": id}).as_object().cloned().unwrap();
        Record::new(&StreamDescriptor::new(stream), data)
    }

    fn ids(batch: &[Record]) -> Vec<i64> {
        batch
            .iter()
            .map(|r| r.field("id").and_then(serde_json::Value::as_i64).unwrap())
            .collect()
    }

    #[test]
    fn full_buffer_is_returned_and_reset() {
        let mut batcher = WriteBatcher::new(2);
        assert!(batcher.push(record("users", 1)).is_none());
        let (stream, batch) = batcher.push(record("users", 2)).unwrap();
        assert_eq!(stream, StreamDescriptor::new("users"));
        assert_eq!(ids(&batch), vec![1, 2]);
        assert_eq!(batcher.pending(), 0);
    }

    #[test]
    fn buffers_are_independent_per_stream() {
        let mut batcher = WriteBatcher::new(3);
        batcher.push(record("users", 1));
        batcher.push(record("orders", 10));
        batcher.push(record("users", 2));
        assert_eq!(batcher.pending(), 3);
        let drained = batcher.drain();
        let streams: Vec<_> = drained.iter().map(|(d, _)| d.name.as_str()).collect();
        assert_eq!(streams, vec!["users", "orders"]);
        assert_eq!(ids(&drained[0].1), vec![1, 2]);
        assert!(batcher.drain().is_empty());
    }

    #[test]
    fn zero_batch_size_behaves_as_one() {
        let mut batcher = WriteBatcher::new(0);
        assert!(batcher.push(record("users", 1)).is_some());
    }
}
