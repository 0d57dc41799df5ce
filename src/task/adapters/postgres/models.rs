//! Diesel row models for task and status persistence.

use super::schema::{task_statuses, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Row model for task records.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TaskRow {
    /// Task identifier.
    pub id: i64,
    /// Task name.
    pub name: String,
    /// Task kind.
    pub kind: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optional description.
    pub description: Option<String>,
    /// Opaque payload.
    pub payload: String,
}

/// Row model for status records.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = task_statuses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct StatusRow {
    /// Identifier shared with the task.
    pub id: i64,
    /// Integer status code.
    pub status: i16,
    /// Completion percentage.
    pub progress: i16,
    /// Start timestamp.
    pub start_time: Option<DateTime<Utc>>,
    /// Latest mutation timestamp.
    pub update_time: Option<DateTime<Utc>>,
    /// Selection flag.
    pub enabled: bool,
    /// Claiming worker.
    pub worker: Option<String>,
    /// Optimistic-concurrency stamp.
    pub version: i64,
}

/// Result row for identifier allocation.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub struct AllocatedId {
    /// Newly allocated identifier.
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub id: i64,
}
