//! Service-level errors and their protocol-independent classification.

use crate::task::{
    domain::{TaskDomainError, TaskId},
    ports::RecordStoreError,
};
use thiserror::Error;

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] RecordStoreError),

    /// No task or status exists with the given identifier.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// A status references a task that does not exist.
    #[error("status {0} references a missing task")]
    MissingTask(TaskId),

    /// A task has no status record.
    #[error("task {0} has no status record")]
    MissingStatus(TaskId),

    /// Every compare-and-swap attempt lost to a concurrent writer.
    #[error("task {task_id} changed concurrently; gave up after {attempts} attempts")]
    Conflict {
        /// Task that could not be updated.
        task_id: TaskId,
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Coarse error classification for callers mapping errors to a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown identifier or a dangling task/status reference.
    NotFound,
    /// Malformed input such as out-of-range progress.
    InvalidArgument,
    /// Operation not permitted for the current status.
    InvalidState,
    /// Lost a race with a concurrent writer.
    Conflict,
    /// Storage or encoding failure.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code a REST front end should answer with.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InvalidArgument => 400,
            Self::InvalidState | Self::Conflict => 409,
            Self::Internal => 500,
        }
    }

    /// Returns the canonical textual representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::InvalidState => "invalid_state",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

impl TaskLifecycleError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(TaskDomainError::InvalidStateTransition { .. }) => ErrorKind::InvalidState,
            Self::Domain(_) => ErrorKind::InvalidArgument,
            Self::Store(_) => ErrorKind::Internal,
            Self::NotFound(_) | Self::MissingTask(_) | Self::MissingStatus(_) => {
                ErrorKind::NotFound
            }
            Self::Conflict { .. } => ErrorKind::Conflict,
        }
    }
}
