//! Convenience re-exports for connector authors.
//!
//! ```ignore
//! use shift_sdk::prelude::*;
//! ```

// Capability traits
pub use crate::connector::{
    BatchAck, Checker, Connector, Destination, Discoverer, Reader, Source, Specifier, WriteSink,
    Writer,
};

// Read side
pub use crate::engine::{ReadEmitter, ReadEvent, StateUpdate};

// Errors
pub use shift_types::error::{ConnectorError, ErrorCategory};

// Protocol types
pub use shift_types::catalog::{
    Catalog, ConfiguredCatalog, ConfiguredStream, Stream, StreamDescriptor,
};
pub use shift_types::message::LogLevel;
pub use shift_types::record::Record;
pub use shift_types::state::State;
pub use shift_types::wire::{
    ConnectionStatus, ConnectorSpecification, DestinationSyncMode, SyncMode,
};

// Entry points
pub use crate::{adapter_main, driver_main};
