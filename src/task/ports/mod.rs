//! Port contracts for task lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod store;

pub use store::{Record, RecordStore, RecordStoreError, RecordStoreResult, Versioned, VersionedStore};
