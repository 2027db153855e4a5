//! Runtime for Shift connectors.
//!
//! A connector binary implements the capability traits in [`connector`] and
//! hands itself to [`driver_main`] or [`adapter_main`]; the runtime parses
//! the command line, runs exactly one command through the [`command`]
//! state machine, and writes protocol messages to stdout.

pub mod bootstrap;
pub mod cli;
pub mod codec;
pub mod command;
pub mod config;
pub mod connector;
pub mod engine;
pub mod error;
pub mod logging;
pub mod prelude;

pub use bootstrap::{adapter_main, driver_main};
pub use shift_types as types;
