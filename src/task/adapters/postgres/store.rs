//! `PostgreSQL` record store for tasks and statuses.

use super::{
    models::{AllocatedId, StatusRow, TaskRow},
    schema::{task_statuses, tasks},
};
use crate::task::{
    domain::{
        PersistedStatusData, PersistedTaskData, Progress, Status, Task, TaskId, TaskKind,
        TaskStatus, WorkerId,
    },
    ports::{RecordStore, RecordStoreError, RecordStoreResult, VersionedStore},
};
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use tracing::debug;

/// `PostgreSQL` connection pool type used by the task store.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

const CREATE_TABLES: &str =
    include_str!("../../../../migrations/2025-06-01-000000_create_task_tables/up.sql");

/// `PostgreSQL`-backed store holding both the task and status collections.
///
/// Status compare-and-swap is a single conditional `UPDATE`, so it stays
/// atomic across processes sharing the database.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: TaskPgPool,
}

impl PostgresRecordStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    /// Builds a pool for `database_url` and wraps it in a store.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Persistence`] when the pool cannot be
    /// built.
    pub fn connect(database_url: &str) -> RecordStoreResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .build(manager)
            .map_err(RecordStoreError::persistence)?;
        Ok(Self::new(pool))
    }

    /// Creates the task tables when they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Persistence`] when the DDL fails.
    pub async fn ensure_schema(&self) -> RecordStoreResult<()> {
        self.run_blocking(|connection| {
            connection
                .batch_execute(CREATE_TABLES)
                .map_err(RecordStoreError::persistence)
        })
        .await?;
        debug!("ensured task tables exist");
        Ok(())
    }

    async fn run_blocking<F, T>(&self, f: F) -> RecordStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RecordStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(RecordStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(RecordStoreError::persistence)?
    }
}

fn allocate_id(connection: &mut PgConnection) -> RecordStoreResult<TaskId> {
    let allocated = diesel::sql_query("SELECT nextval(pg_get_serial_sequence('tasks', 'id')) AS id")
        .get_result::<AllocatedId>(connection)
        .map_err(RecordStoreError::persistence)?;
    from_db_id(allocated.id)
}

#[async_trait]
impl RecordStore<Task> for PostgresRecordStore {
    async fn next_id(&self) -> RecordStoreResult<TaskId> {
        self.run_blocking(allocate_id).await
    }

    async fn get(&self, id: TaskId) -> RecordStoreResult<Option<Task>> {
        let key = to_db_id(id)?;
        self.run_blocking(move |connection| {
            let row = tasks::table
                .find(key)
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(RecordStoreError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn put(&self, record: &Task) -> RecordStoreResult<()> {
        let row = task_to_row(record)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&row)
                .on_conflict(tasks::id)
                .do_update()
                .set(&row)
                .execute(connection)
                .map_err(RecordStoreError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn list(&self) -> RecordStoreResult<Vec<Task>> {
        self.run_blocking(|connection| {
            tasks::table
                .order(tasks::id.asc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(RecordStoreError::persistence)?
                .into_iter()
                .map(row_to_task)
                .collect()
        })
        .await
    }

    async fn delete(&self, id: TaskId) -> RecordStoreResult<bool> {
        let key = to_db_id(id)?;
        self.run_blocking(move |connection| {
            let removed = diesel::delete(tasks::table.find(key))
                .execute(connection)
                .map_err(RecordStoreError::persistence)?;
            Ok(removed > 0)
        })
        .await
    }
}

#[async_trait]
impl RecordStore<Status> for PostgresRecordStore {
    async fn next_id(&self) -> RecordStoreResult<TaskId> {
        self.run_blocking(allocate_id).await
    }

    async fn get(&self, id: TaskId) -> RecordStoreResult<Option<Status>> {
        let key = to_db_id(id)?;
        self.run_blocking(move |connection| {
            let row = task_statuses::table
                .find(key)
                .select(StatusRow::as_select())
                .first::<StatusRow>(connection)
                .optional()
                .map_err(RecordStoreError::persistence)?;
            row.map(row_to_status).transpose()
        })
        .await
    }

    async fn put(&self, record: &Status) -> RecordStoreResult<()> {
        let row = status_to_row(record)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(task_statuses::table)
                .values(&row)
                .on_conflict(task_statuses::id)
                .do_update()
                .set(&row)
                .execute(connection)
                .map_err(RecordStoreError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn list(&self) -> RecordStoreResult<Vec<Status>> {
        self.run_blocking(|connection| {
            task_statuses::table
                .order(task_statuses::id.asc())
                .select(StatusRow::as_select())
                .load::<StatusRow>(connection)
                .map_err(RecordStoreError::persistence)?
                .into_iter()
                .map(row_to_status)
                .collect()
        })
        .await
    }

    async fn delete(&self, id: TaskId) -> RecordStoreResult<bool> {
        let key = to_db_id(id)?;
        self.run_blocking(move |connection| {
            let removed = diesel::delete(task_statuses::table.find(key))
                .execute(connection)
                .map_err(RecordStoreError::persistence)?;
            Ok(removed > 0)
        })
        .await
    }
}

#[async_trait]
impl VersionedStore<Status> for PostgresRecordStore {
    async fn compare_and_put(
        &self,
        record: &Status,
        expected_version: u64,
    ) -> RecordStoreResult<bool> {
        let row = status_to_row(record)?;
        let expected = i64::try_from(expected_version).map_err(RecordStoreError::persistence)?;
        self.run_blocking(move |connection| {
            let updated = diesel::update(
                task_statuses::table
                    .filter(task_statuses::id.eq(row.id))
                    .filter(task_statuses::version.eq(expected)),
            )
            .set(&row)
            .execute(connection)
            .map_err(RecordStoreError::persistence)?;
            Ok(updated == 1)
        })
        .await
    }
}

fn to_db_id(id: TaskId) -> RecordStoreResult<i64> {
    i64::try_from(id.value()).map_err(RecordStoreError::persistence)
}

fn from_db_id(id: i64) -> RecordStoreResult<TaskId> {
    u64::try_from(id)
        .map(TaskId::new)
        .map_err(RecordStoreError::persistence)
}

fn task_to_row(task: &Task) -> RecordStoreResult<TaskRow> {
    Ok(TaskRow {
        id: to_db_id(task.id())?,
        name: task.name().to_owned(),
        kind: task.kind().value(),
        created_at: task.created_at(),
        description: task.description().map(str::to_owned),
        payload: task.payload().to_owned(),
    })
}

fn row_to_task(row: TaskRow) -> RecordStoreResult<Task> {
    let data = PersistedTaskData {
        id: from_db_id(row.id)?,
        name: row.name,
        kind: TaskKind::new(row.kind),
        created_at: row.created_at,
        description: row.description,
        payload: row.payload,
    };
    Task::from_persisted(data).map_err(RecordStoreError::persistence)
}

fn status_to_row(status: &Status) -> RecordStoreResult<StatusRow> {
    Ok(StatusRow {
        id: to_db_id(status.id())?,
        status: i16::from(status.status().code()),
        progress: i16::from(status.progress().value()),
        start_time: status.start_time(),
        update_time: status.update_time(),
        enabled: status.is_enabled(),
        worker: status.worker().map(|worker| worker.as_str().to_owned()),
        version: i64::try_from(status.version()).map_err(RecordStoreError::persistence)?,
    })
}

fn row_to_status(row: StatusRow) -> RecordStoreResult<Status> {
    let data = PersistedStatusData {
        id: from_db_id(row.id)?,
        status: TaskStatus::try_from(i64::from(row.status))
            .map_err(RecordStoreError::persistence)?,
        progress: Progress::new(i64::from(row.progress)).map_err(RecordStoreError::persistence)?,
        start_time: row.start_time,
        update_time: row.update_time,
        enabled: row.enabled,
        worker: row
            .worker
            .map(WorkerId::new)
            .transpose()
            .map_err(RecordStoreError::persistence)?,
        version: u64::try_from(row.version).map_err(RecordStoreError::persistence)?,
    };
    Ok(Status::from_persisted(data))
}
