//! Record store port for task and status persistence.

use crate::codec::CodecError;
use crate::task::domain::{Status, Task, TaskId};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use thiserror::Error;

/// Result type for record store operations.
pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

/// Capability required of anything kept in a [`RecordStore`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Returns the key the record is stored under.
    fn id(&self) -> TaskId;
}

/// Record carrying a version stamp for compare-and-swap writes.
pub trait Versioned: Record {
    /// Returns the version stamp.
    fn version(&self) -> u64;
}

impl Record for Task {
    fn id(&self) -> TaskId {
        Self::id(self)
    }
}

impl Record for Status {
    fn id(&self) -> TaskId {
        Self::id(self)
    }
}

impl Versioned for Status {
    fn version(&self) -> u64 {
        Self::version(self)
    }
}

/// Keyed storage with ordered iteration.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Allocates the identifier for a record about to be created.
    ///
    /// Identifiers are strictly increasing and never reused.
    async fn next_id(&self) -> RecordStoreResult<TaskId>;

    /// Fetches a record.
    ///
    /// Returns `None` when no record has the identifier.
    async fn get(&self, id: TaskId) -> RecordStoreResult<Option<R>>;

    /// Inserts or overwrites the record stored under its identifier.
    async fn put(&self, record: &R) -> RecordStoreResult<()>;

    /// Returns every record in creation order.
    async fn list(&self) -> RecordStoreResult<Vec<R>>;

    /// Removes a record.
    ///
    /// Returns `false` when nothing was stored under the identifier.
    async fn delete(&self, id: TaskId) -> RecordStoreResult<bool>;
}

/// Store supporting atomic per-key compare-and-swap.
#[async_trait]
pub trait VersionedStore<R: Versioned>: RecordStore<R> {
    /// Writes `record` only if the stored record still has
    /// `expected_version`.
    ///
    /// Returns `false`, leaving storage untouched, when the stored version
    /// differs or the record no longer exists.
    async fn compare_and_put(&self, record: &R, expected_version: u64)
    -> RecordStoreResult<bool>;
}

/// Errors returned by record store implementations.
#[derive(Debug, Clone, Error)]
pub enum RecordStoreError {
    /// A stored document could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RecordStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
