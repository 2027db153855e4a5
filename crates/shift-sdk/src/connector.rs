//! Async-first connector capability traits.
//!
//! Each capability is its own trait so a connector implements exactly what
//! its role needs. [`Source`] and [`Destination`] are blanket role traits:
//! anything implementing the right capabilities is one.

use serde::de::DeserializeOwned;

use shift_types::catalog::{Catalog, ConfiguredCatalog, ConfiguredStream};
use shift_types::error::ConnectorError;
use shift_types::record::Record;
use shift_types::state::State;
use shift_types::wire::{ConnectionStatus, ConnectorSpecification};

use crate::engine::read::ReadEmitter;

/// Base trait carrying the connector's config type.
pub trait Connector {
    type Config: DeserializeOwned;
}

/// Self-description. Must not depend on config or the network.
#[allow(async_fn_in_trait)]
pub trait Specifier {
    async fn spec(&self) -> Result<ConnectorSpecification, ConnectorError>;
}

/// Connect-and-teardown check. Implementations apply their own timeout.
#[allow(async_fn_in_trait)]
pub trait Checker: Connector {
    async fn check(&self, config: &Self::Config) -> Result<ConnectionStatus, ConnectorError>;
}

/// Stream enumeration. Idempotent and side-effect free.
#[allow(async_fn_in_trait)]
pub trait Discoverer: Connector {
    async fn discover(&self, config: &Self::Config) -> Result<Catalog, ConnectorError>;
}

/// Driver-side data extraction.
#[allow(async_fn_in_trait)]
pub trait Reader: Connector {
    /// Produce records, state updates and log lines through `emitter`.
    ///
    /// `state` is the position to resume from. Every `emitter` call awaits
    /// channel capacity, so the engine sets the pace. Returning drops the
    /// emitter and ends the sequence.
    async fn read(
        &self,
        config: &Self::Config,
        catalog: &ConfiguredCatalog,
        state: &State,
        emitter: ReadEmitter,
    ) -> Result<(), ConnectorError>;
}

/// Acknowledgement of a flushed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchAck {
    pub records_written: u64,
}

/// Open destination handle. Flushes are never concurrent.
#[allow(async_fn_in_trait)]
pub trait WriteSink {
    /// Durably write one batch of records belonging to `stream`.
    async fn flush(
        &mut self,
        stream: &ConfiguredStream,
        records: Vec<Record>,
    ) -> Result<BatchAck, ConnectorError>;

    /// Release the destination once every batch has been flushed.
    async fn close(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }
}

/// Adapter-side destination.
#[allow(async_fn_in_trait)]
pub trait Writer: Connector {
    type Sink: WriteSink;

    async fn open(
        &self,
        config: &Self::Config,
        catalog: &ConfiguredCatalog,
    ) -> Result<Self::Sink, ConnectorError>;
}

/// A driver: everything needed to serve `spec`, `check`, `discover`, `read`.
pub trait Source: Specifier + Checker + Discoverer + Reader {}

impl<T: Specifier + Checker + Discoverer + Reader> Source for T {}

/// An adapter: everything needed to serve `spec`, `check`, `discover`, `write`.
pub trait Destination: Specifier + Checker + Discoverer + Writer {}

impl<T: Specifier + Checker + Discoverer + Writer> Destination for T {}
