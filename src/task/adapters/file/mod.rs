//! Filesystem adapters for task lifecycle storage.

mod store;

pub use store::JsonFileRecordStore;
