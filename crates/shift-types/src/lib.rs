//! Shared Shift protocol, catalog, state, and error model types.
//!
//! This crate is dependency-boundary-safe for both the runtime and
//! connector implementations.

pub mod catalog;
pub mod error;
pub mod message;
pub mod record;
pub mod state;
pub mod wire;
