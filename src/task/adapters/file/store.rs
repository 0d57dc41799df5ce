//! Directory-backed record store keeping one JSON document per record.

use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs::{Dir, File, OpenOptions};
use fd_lock::RwLock;
use std::io;
use std::marker::PhantomData;
use std::process;
use std::sync::Arc;
use tracing::debug;

use crate::codec::{from_json, to_json_pretty};
use crate::task::{
    domain::TaskId,
    ports::{Record, RecordStore, RecordStoreError, RecordStoreResult, Versioned, VersionedStore},
};

const RECORD_EXTENSION: &str = ".json";
const SEQUENCE_FILE: &str = ".sequence";
const LOCK_FILE: &str = ".lock";

/// Record store persisting each record as `<collection>/<id>.json`.
///
/// Writes go through a temporary file and a rename, so readers never see a
/// partially written record. Every operation holds an advisory lock on
/// `<collection>/.lock`: writers (id allocation, put, delete and
/// compare-and-swap) take it exclusively and readers take it shared. Any
/// number of store instances, in one process or many, can therefore share a
/// collection directory on a local filesystem.
#[derive(Debug)]
pub struct JsonFileRecordStore<R> {
    dir: Arc<Dir>,
    collection: String,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for JsonFileRecordStore<R> {
    fn clone(&self) -> Self {
        Self {
            dir: Arc::clone(&self.dir),
            collection: self.collection.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> JsonFileRecordStore<R> {
    /// Opens the collection directory below `root`, creating both when
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Persistence`] when the collection name is
    /// not a single path segment or the directories cannot be opened.
    pub fn open(root: &Utf8Path, collection: &str) -> RecordStoreResult<Self> {
        validate_collection(collection)?;
        Dir::create_ambient_dir_all(root, ambient_authority())
            .map_err(RecordStoreError::persistence)?;
        let root_dir = Dir::open_ambient_dir(root, ambient_authority())
            .map_err(RecordStoreError::persistence)?;
        root_dir
            .create_dir_all(collection)
            .map_err(RecordStoreError::persistence)?;
        let dir = root_dir
            .open_dir(collection)
            .map_err(RecordStoreError::persistence)?;
        debug!(%root, collection, "opened file record store");

        Ok(Self {
            dir: Arc::new(dir),
            collection: collection.to_owned(),
            _record: PhantomData,
        })
    }

    /// Returns the collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Runs `f` on a blocking thread while holding the collection lock
    /// shared.
    async fn read_locked<F, T>(&self, f: F) -> RecordStoreResult<T>
    where
        F: FnOnce(&Dir) -> RecordStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.run_blocking(move |dir| {
            let lock = RwLock::new(open_lock_file(dir)?);
            let _guard = lock.read().map_err(RecordStoreError::persistence)?;
            f(dir)
        })
        .await
    }

    /// Runs `f` on a blocking thread while holding the collection lock
    /// exclusively.
    async fn write_locked<F, T>(&self, f: F) -> RecordStoreResult<T>
    where
        F: FnOnce(&Dir) -> RecordStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.run_blocking(move |dir| {
            let mut lock = RwLock::new(open_lock_file(dir)?);
            let _guard = lock.write().map_err(RecordStoreError::persistence)?;
            f(dir)
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> RecordStoreResult<T>
    where
        F: FnOnce(&Dir) -> RecordStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        tokio::task::spawn_blocking(move || f(&dir))
            .await
            .map_err(RecordStoreError::persistence)?
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for JsonFileRecordStore<R> {
    async fn next_id(&self) -> RecordStoreResult<TaskId> {
        let id = self
            .write_locked(|dir| {
                let last_allocated = read_sequence(dir)?;
                let last_stored = record_ids(dir)?.last().map_or(0, |id| id.value());
                let next = TaskId::new(last_allocated.max(last_stored)).next();
                dir.write(SEQUENCE_FILE, next.value().to_string())
                    .map_err(RecordStoreError::persistence)?;
                Ok(next)
            })
            .await?;
        debug!(collection = %self.collection, %id, "allocated record id");
        Ok(id)
    }

    async fn get(&self, id: TaskId) -> RecordStoreResult<Option<R>> {
        self.read_locked(move |dir| read_record(dir, id)).await
    }

    async fn put(&self, record: &R) -> RecordStoreResult<()> {
        let owned = record.clone();
        self.write_locked(move |dir| write_record(dir, &owned))
            .await?;
        debug!(collection = %self.collection, id = %record.id(), "stored record");
        Ok(())
    }

    async fn list(&self) -> RecordStoreResult<Vec<R>> {
        self.read_locked(|dir| {
            let mut records = Vec::new();
            for id in record_ids(dir)? {
                if let Some(record) = read_record(dir, id)? {
                    records.push(record);
                }
            }
            Ok(records)
        })
        .await
    }

    async fn delete(&self, id: TaskId) -> RecordStoreResult<bool> {
        let removed = self
            .write_locked(move |dir| match dir.remove_file(record_file_name(id)) {
                Ok(()) => Ok(true),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(err) => Err(RecordStoreError::persistence(err)),
            })
            .await?;
        debug!(collection = %self.collection, %id, removed, "deleted record");
        Ok(removed)
    }
}

#[async_trait]
impl<R: Versioned> VersionedStore<R> for JsonFileRecordStore<R> {
    async fn compare_and_put(
        &self,
        record: &R,
        expected_version: u64,
    ) -> RecordStoreResult<bool> {
        let owned = record.clone();
        let swapped = self
            .write_locked(move |dir| {
                let stored: Option<R> = read_record(dir, owned.id())?;
                if stored.is_none_or(|current| current.version() != expected_version) {
                    return Ok(false);
                }
                write_record(dir, &owned)?;
                Ok(true)
            })
            .await?;
        debug!(
            collection = %self.collection,
            id = %record.id(),
            expected_version,
            swapped,
            "compare-and-put"
        );
        Ok(swapped)
    }
}

fn validate_collection(collection: &str) -> RecordStoreResult<()> {
    let is_valid = !collection.is_empty()
        && collection != "."
        && collection != ".."
        && !collection.contains(['/', '\\']);
    if is_valid {
        return Ok(());
    }
    Err(RecordStoreError::persistence(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("invalid collection name '{collection}'"),
    )))
}

fn record_file_name(id: TaskId) -> String {
    format!("{id}{RECORD_EXTENSION}")
}

fn parse_record_file_name(name: &str) -> Option<TaskId> {
    name.strip_suffix(RECORD_EXTENSION)?
        .parse::<u64>()
        .ok()
        .map(TaskId::new)
}

/// Returns stored identifiers in ascending, and therefore creation, order.
fn record_ids(dir: &Dir) -> RecordStoreResult<Vec<TaskId>> {
    let mut ids = Vec::new();
    for entry in dir.entries().map_err(RecordStoreError::persistence)? {
        let entry = entry.map_err(RecordStoreError::persistence)?;
        let file_name = entry.file_name();
        if let Some(id) = file_name.to_str().and_then(parse_record_file_name) {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

fn read_record<R: Record>(dir: &Dir, id: TaskId) -> RecordStoreResult<Option<R>> {
    match dir.read_to_string(record_file_name(id)) {
        Ok(text) => Ok(Some(from_json(&text)?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(RecordStoreError::persistence(err)),
    }
}

fn open_lock_file(dir: &Dir) -> RecordStoreResult<File> {
    dir.open_with(LOCK_FILE, OpenOptions::new().read(true).write(true).create(true))
        .map_err(RecordStoreError::persistence)
}

/// Callers hold the exclusive lock. Staging names are per process.
fn write_record<R: Record>(dir: &Dir, record: &R) -> RecordStoreResult<()> {
    let target = record_file_name(record.id());
    let staging = format!(".{target}.{}.tmp", process::id());
    dir.write(&staging, to_json_pretty(record)?)
        .map_err(RecordStoreError::persistence)?;
    dir.rename(&staging, dir, &target)
        .map_err(RecordStoreError::persistence)
}

fn read_sequence(dir: &Dir) -> RecordStoreResult<u64> {
    match dir.read_to_string(SEQUENCE_FILE) {
        Ok(text) => text.trim().parse::<u64>().map_err(RecordStoreError::persistence),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(err) => Err(RecordStoreError::persistence(err)),
    }
}
