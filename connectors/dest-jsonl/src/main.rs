//! JSON-lines destination.
//!
//! Writes each configured stream to `<destination_path>/<stream>.jsonl`,
//! one encoded record per line. Supports `append` and `overwrite`.

mod config;
mod sink;

use std::path::Path;
use std::process::ExitCode;

use serde_json::json;
use shift_sdk::prelude::*;

use crate::sink::JsonlSink;

pub struct DestJsonl;

impl Connector for DestJsonl {
    type Config = config::Config;
}

impl Specifier for DestJsonl {
    async fn spec(&self) -> Result<ConnectorSpecification, ConnectorError> {
        Ok(ConnectorSpecification {
            documentation_url: None,
            connection_specification: json!({
                "type": "object",
                "required": ["destination_path"],
                "additionalProperties": false,
                "properties": {
                    "destination_path": {"type": "string"}
                }
            }),
            supports_incremental: true,
            supported_destination_sync_modes: vec![
                DestinationSyncMode::Append,
                DestinationSyncMode::Overwrite,
            ],
        })
    }
}

/// Create the destination directory and round-trip a scratch file in it.
async fn try_write(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let scratch = dir.join(".shift-check");
    tokio::fs::write(&scratch, b"ok").await?;
    tokio::fs::remove_file(&scratch).await
}

impl Checker for DestJsonl {
    async fn check(&self, config: &Self::Config) -> Result<ConnectionStatus, ConnectorError> {
        match try_write(&config.destination_path).await {
            Ok(()) => Ok(ConnectionStatus::succeeded()),
            Err(e) => Ok(ConnectionStatus::failed(format!(
                "{} is not writable: {}",
                config.destination_path.display(),
                e
            ))),
        }
    }
}

impl Discoverer for DestJsonl {
    /// Streams already present in the destination directory, by file name.
    async fn discover(&self, config: &Self::Config) -> Result<Catalog, ConnectorError> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&config.destination_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Catalog::default());
            }
            Err(e) => return Err(ConnectorError::discovery("LIST_FAILED", e.to_string())),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ConnectorError::discovery("LIST_FAILED", e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(Catalog {
            streams: names
                .into_iter()
                .map(|name| Stream::new(name, json!({"type": "object"})))
                .collect(),
        })
    }
}

impl Writer for DestJsonl {
    type Sink = JsonlSink;

    async fn open(
        &self,
        config: &Self::Config,
        catalog: &ConfiguredCatalog,
    ) -> Result<JsonlSink, ConnectorError> {
        tracing::info!(
            dir = %config.destination_path.display(),
            streams = catalog.streams.len(),
            "Opening dest-jsonl"
        );
        JsonlSink::open(&config.destination_path, catalog).await
    }
}

fn main() -> ExitCode {
    shift_sdk::adapter_main(DestJsonl)
}
