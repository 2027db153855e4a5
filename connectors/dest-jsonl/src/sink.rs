//! Per-stream JSON-lines files.

use std::path::{is_separator, Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use shift_sdk::prelude::*;

/// File a stream's records are written to: `<namespace>.<name>.jsonl`, or
/// `<name>.jsonl` without a namespace.
pub fn stream_file(dir: &Path, stream: &StreamDescriptor) -> PathBuf {
    dir.join(format!("{stream}.jsonl"))
}

/// A name part that stays inside the destination directory once joined.
fn is_plain_name(part: &str) -> bool {
    !part.is_empty()
        && part != "."
        && part != ".."
        && !part.chars().any(|c| is_separator(c) || c == '\0')
}

fn check_stream(configured: &ConfiguredStream) -> Result<(), ConnectorError> {
    let descriptor = configured.descriptor();
    let parts = std::iter::once(descriptor.name.as_str());
    for part in parts.chain(descriptor.namespace.as_deref()) {
        if !is_plain_name(part) {
            return Err(ConnectorError::config(
                "INVALID_STREAM_NAME",
                format!("Stream '{descriptor}' cannot be used as a file name"),
            ));
        }
    }
    if configured.destination_sync_mode == DestinationSyncMode::AppendDedup {
        return Err(ConnectorError::config(
            "UNSUPPORTED_SYNC_MODE",
            format!(
                "Stream '{descriptor}' requests append_dedup, which dest-jsonl does not support"
            ),
        ));
    }
    Ok(())
}

pub struct JsonlSink {
    dir: PathBuf,
}

impl JsonlSink {
    /// Prepare `dir` for `catalog`: reject unusable streams, create the
    /// directory and empty every `overwrite` stream's file.
    pub async fn open(dir: &Path, catalog: &ConfiguredCatalog) -> Result<Self, ConnectorError> {
        for configured in &catalog.streams {
            check_stream(configured)?;
        }
        prepare(dir, catalog)
            .await
            .map_err(|e| ConnectorError::write("OPEN_FAILED", format!("{e:#}")))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    async fn append(&self, stream: &ConfiguredStream, records: &[Record]) -> Result<u64> {
        let path = stream_file(&self.dir, &stream.descriptor());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        file.write_all(&buf)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        file.flush().await?;
        Ok(records.len() as u64)
    }
}

async fn prepare(dir: &Path, catalog: &ConfiguredCatalog) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    for configured in &catalog.streams {
        if configured.destination_sync_mode != DestinationSyncMode::Overwrite {
            continue;
        }
        let path = stream_file(dir, &configured.descriptor());
        fs::write(&path, b"")
            .await
            .with_context(|| format!("Failed to truncate {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Truncated overwrite stream");
    }
    Ok(())
}

impl WriteSink for JsonlSink {
    async fn flush(
        &mut self,
        stream: &ConfiguredStream,
        records: Vec<Record>,
    ) -> Result<BatchAck, ConnectorError> {
        let records_written = self
            .append(stream, &records)
            .await
            .map_err(|e| ConnectorError::write("WRITE_FAILED", format!("{e:#}")))?;
        tracing::debug!(stream = %stream.descriptor(), records = records_written, "Appended batch");
        Ok(BatchAck { records_written })
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        tracing::info!(dir = %self.dir.display(), "Closing dest-jsonl");
        Ok(())
    }
}
