//! Adapter implementations for task lifecycle ports.
//!
//! - [`memory`]: process-local store used by tests and embedders.
//! - [`file`]: one JSON document per record inside a collection directory.
//! - [`postgres`]: Diesel-backed store with SQL compare-and-swap.

pub mod file;
pub mod memory;
pub mod postgres;
