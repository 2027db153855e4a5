//! Batching and checkpoint engine.
//!
//! [`read`] drives a driver's event sequence into RECORD and STATE messages;
//! [`write`] groups incoming records into per-stream batches for a sink.

pub mod read;
pub mod write;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use shift_types::error::ConnectorError;

use crate::error::{Result, ShiftError};

pub use read::{run_read, ReadEmitter, ReadEvent, StateUpdate};
pub use write::{run_write, WriteBatcher};

/// Counters for a completed `read`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub records: u64,
    pub checkpoints: u64,
    pub decode_errors: u64,
    pub rejected_states: u64,
}

/// Counters for a completed `write`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub records_received: u64,
    pub records_written: u64,
    pub batches: u64,
    pub failed_batches: u64,
    pub states_echoed: u64,
}

/// Await a capability call, turning a panic into [`ShiftError::Panic`].
pub(crate) async fn catch_panic<T, F>(fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, ConnectorError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result.map_err(ShiftError::from),
        Err(payload) => Err(ShiftError::Panic {
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
