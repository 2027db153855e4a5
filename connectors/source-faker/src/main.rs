//! Synthetic-data driver.
//!
//! Generates deterministic `users` and `purchases` streams from a seed.
//! Both streams support full refresh and incremental reads; an incremental
//! read resumes after the cursor held in the input state.

mod config;
mod generator;
mod reader;
mod schema;

use std::process::ExitCode;
use std::time::Duration;

use serde_json::json;
use shift_sdk::prelude::*;

use crate::generator::Generator;
use crate::schema::FakerStream;

pub struct SourceFaker;

impl Connector for SourceFaker {
    type Config = config::Config;
}

impl Specifier for SourceFaker {
    async fn spec(&self) -> Result<ConnectorSpecification, ConnectorError> {
        Ok(ConnectorSpecification {
            documentation_url: None,
            connection_specification: json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "count": {"type": "integer", "minimum": 0, "default": 1000},
                    "seed": {"type": "integer", "minimum": 0, "default": 0},
                    "purchases_per_user": {
                        "type": "integer",
                        "minimum": 0,
                        "maximum": config::MAX_PURCHASES_PER_USER,
                        "default": 2
                    },
                    "records_per_state": {"type": "integer", "minimum": 1, "default": 500},
                    "check_timeout_ms": {"type": "integer", "minimum": 1, "default": 5000}
                }
            }),
            supports_incremental: true,
            supported_destination_sync_modes: Vec::new(),
        })
    }
}

/// Generate one row of each stream, yielding in between.
async fn connect(config: &config::Config) {
    let generator = Generator::new(config.seed, config.count);
    for stream in [FakerStream::Users, FakerStream::Purchases] {
        let _ = generator.row(stream, 0);
        tokio::task::yield_now().await;
    }
}

impl Checker for SourceFaker {
    async fn check(&self, config: &Self::Config) -> Result<ConnectionStatus, ConnectorError> {
        if let Err(e) = config.validate() {
            return Ok(ConnectionStatus::failed(e.message));
        }
        let timeout = Duration::from_millis(config.check_timeout_ms);
        match tokio::time::timeout(timeout, connect(config)).await {
            Ok(()) => Ok(ConnectionStatus::succeeded()),
            Err(_) => Ok(ConnectionStatus::failed(format!(
                "generator did not respond within {} ms",
                config.check_timeout_ms
            ))),
        }
    }
}

impl Discoverer for SourceFaker {
    async fn discover(&self, config: &Self::Config) -> Result<Catalog, ConnectorError> {
        config.validate()?;
        Ok(Catalog {
            streams: schema::all_streams(),
        })
    }
}

impl Reader for SourceFaker {
    async fn read(
        &self,
        config: &Self::Config,
        catalog: &ConfiguredCatalog,
        state: &State,
        emitter: ReadEmitter,
    ) -> Result<(), ConnectorError> {
        config.validate()?;
        for configured in &catalog.streams {
            let stream = configured.descriptor();
            tracing::info!(stream = %stream, mode = %configured.sync_mode, "Starting faker read");
            let records = reader::read_stream(config, configured, state, &emitter).await?;
            tracing::info!(stream = %stream, records, "Faker read complete");
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    shift_sdk::driver_main(SourceFaker)
}
