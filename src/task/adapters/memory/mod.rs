//! In-memory adapters for task lifecycle storage.

mod store;

pub use store::InMemoryRecordStore;
