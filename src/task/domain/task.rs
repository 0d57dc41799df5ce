//! Task records: the immutable description of a unit of work.

use super::{Status, TaskDomainError, TaskId, TaskKind};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Longest task name accepted, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Description of a unit of work.
///
/// Only the descriptive fields may change after creation; the lifecycle of
/// the work lives in the matching [`Status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PersistedTaskData")]
pub struct Task {
    id: TaskId,
    name: String,
    kind: TaskKind,
    created_at: DateTime<Utc>,
    description: Option<String>,
    payload: String,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted task name.
    pub name: String,
    /// Persisted task kind.
    pub kind: TaskKind,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted description, if any.
    #[serde(default)]
    pub description: Option<String>,
    /// Persisted opaque payload.
    pub payload: String,
}

impl Task {
    /// Creates a new task with the identifier allocated by the store.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTaskName`] when the name is blank and
    /// [`TaskDomainError::TaskNameTooLong`] past [`MAX_NAME_LENGTH`] characters.
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        kind: TaskKind,
        payload: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        Ok(Self {
            id,
            name: validate_name(name.into())?,
            kind,
            created_at: clock.utc(),
            description: None,
            payload: payload.into(),
        })
    }

    /// Sets the free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reconstructs a task from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTaskName`] when the stored name is
    /// blank.
    pub fn from_persisted(data: PersistedTaskData) -> Result<Self, TaskDomainError> {
        Ok(Self {
            id: data.id,
            name: validate_name(data.name)?,
            kind: data.kind,
            created_at: data.created_at,
            description: data.description,
            payload: data.payload,
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the task kind.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the opaque payload.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Replaces the task name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTaskName`] when the name is blank and
    /// [`TaskDomainError::TaskNameTooLong`] past [`MAX_NAME_LENGTH`] characters.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), TaskDomainError> {
        self.name = validate_name(name.into())?;
        Ok(())
    }

    /// Replaces or clears the description.
    pub fn describe(&mut self, description: Option<String>) {
        self.description = description;
    }
}

impl TryFrom<PersistedTaskData> for Task {
    type Error = TaskDomainError;

    fn try_from(value: PersistedTaskData) -> Result<Self, Self::Error> {
        Self::from_persisted(value)
    }
}

fn validate_name(name: String) -> Result<String, TaskDomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TaskDomainError::EmptyTaskName);
    }
    let length = trimmed.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(TaskDomainError::TaskNameTooLong(length));
    }
    if trimmed.len() == name.len() {
        return Ok(name);
    }
    Ok(trimmed.to_owned())
}

/// A task joined with its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    task: Task,
    status: Status,
}

impl TaskRecord {
    /// Pairs a task with its status.
    ///
    /// Callers are responsible for passing a status with the same
    /// identifier as the task.
    #[must_use]
    pub const fn new(task: Task, status: Status) -> Self {
        Self { task, status }
    }

    /// Returns the task.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> &Status {
        &self.status
    }

    /// Returns the shared identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.task.id()
    }
}
