//! In-memory record store for tests and embedded use.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task::{
    domain::TaskId,
    ports::{Record, RecordStore, RecordStoreError, RecordStoreResult, Versioned, VersionedStore},
};

/// Thread-safe in-memory record store.
///
/// Clones share the same underlying records.
#[derive(Debug)]
pub struct InMemoryRecordStore<R> {
    state: Arc<RwLock<InMemoryState<R>>>,
}

#[derive(Debug)]
struct InMemoryState<R> {
    records: BTreeMap<TaskId, R>,
    last_id: u64,
}

impl<R> Default for InMemoryState<R> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<R> Clone for InMemoryRecordStore<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<R> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryState::default())),
        }
    }
}

impl<R> InMemoryRecordStore<R> {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RecordStoreResult<RwLockReadGuard<'_, InMemoryState<R>>> {
        self.state.read().map_err(|err| {
            RecordStoreError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> RecordStoreResult<RwLockWriteGuard<'_, InMemoryState<R>>> {
        self.state.write().map_err(|err| {
            RecordStoreError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

impl<R: Record> InMemoryState<R> {
    fn insert(&mut self, record: &R) {
        let id = record.id();
        self.last_id = self.last_id.max(id.value());
        self.records.insert(id, record.clone());
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for InMemoryRecordStore<R> {
    async fn next_id(&self) -> RecordStoreResult<TaskId> {
        let mut state = self.write()?;
        state.last_id = state.last_id.saturating_add(1);
        Ok(TaskId::new(state.last_id))
    }

    async fn get(&self, id: TaskId) -> RecordStoreResult<Option<R>> {
        let state = self.read()?;
        Ok(state.records.get(&id).cloned())
    }

    async fn put(&self, record: &R) -> RecordStoreResult<()> {
        let mut state = self.write()?;
        state.insert(record);
        Ok(())
    }

    async fn list(&self) -> RecordStoreResult<Vec<R>> {
        let state = self.read()?;
        Ok(state.records.values().cloned().collect())
    }

    async fn delete(&self, id: TaskId) -> RecordStoreResult<bool> {
        let mut state = self.write()?;
        Ok(state.records.remove(&id).is_some())
    }
}

#[async_trait]
impl<R: Versioned> VersionedStore<R> for InMemoryRecordStore<R> {
    async fn compare_and_put(
        &self,
        record: &R,
        expected_version: u64,
    ) -> RecordStoreResult<bool> {
        let mut state = self.write()?;
        let matches = state
            .records
            .get(&record.id())
            .is_some_and(|stored| stored.version() == expected_version);
        if matches {
            state.insert(record);
        }
        Ok(matches)
    }
}
