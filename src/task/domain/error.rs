//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task name is empty after trimming.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// The task name is longer than the stores accept.
    #[error("task name is {0} characters long, the limit is 255")]
    TaskNameTooLong(usize),

    /// The worker identifier is empty after trimming.
    #[error("worker identifier must not be empty")]
    EmptyWorkerId,

    /// The worker identifier is longer than the stores accept.
    #[error("worker identifier is {0} characters long, the limit is 255")]
    WorkerIdTooLong(usize),

    /// A progress value fell outside `0..=100`.
    #[error("invalid progress {0}, expected a value between 0 and 100")]
    ProgressOutOfRange(i64),

    /// A status code or name could not be parsed.
    #[error(transparent)]
    UnknownStatus(#[from] ParseTaskStatusError),

    /// The requested transition is not allowed from the current status.
    #[error("invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidStateTransition {
        /// Task whose status rejected the transition.
        task_id: TaskId,
        /// Status before the attempted transition.
        from: TaskStatus,
        /// Status the caller asked for.
        to: TaskStatus,
    },
}

/// Error returned while parsing task statuses from codes or names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
