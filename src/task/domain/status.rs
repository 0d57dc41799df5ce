//! Task status state machine and the mutable status record.

use super::{ParseTaskStatusError, TaskDomainError, TaskId, WorkerId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
///
/// Persisted as its integer code: `0` not started, `1` in progress,
/// `2` completed, `3` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskStatus {
    /// Task has been created but no worker has started it.
    NotStarted,
    /// Task is being worked on.
    InProgress,
    /// Task finished successfully.
    Completed,
    /// Task failed.
    Error,
}

impl TaskStatus {
    /// Every status in code order.
    pub const ALL: [Self; 4] = [
        Self::NotStarted,
        Self::InProgress,
        Self::Completed,
        Self::Error,
    ];

    /// Returns the persisted integer code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
            Self::Error => 3,
        }
    }

    /// Returns the canonical textual representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Returns `true` for statuses that permit no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns whether a single transition to `target` is permitted.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::NotStarted, Self::InProgress | Self::Error)
                | (Self::InProgress, Self::Completed | Self::Error)
        )
    }
}

impl TryFrom<u8> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: u8) -> Result<Self, ParseTaskStatusError> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == value)
            .ok_or_else(|| ParseTaskStatusError(value.to_string()))
    }
}

impl TryFrom<i64> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: i64) -> Result<Self, ParseTaskStatusError> {
        u8::try_from(value)
            .map_err(|_| ParseTaskStatusError(value.to_string()))
            .and_then(Self::try_from)
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, ParseTaskStatusError> {
        let normalized = value.trim().to_ascii_lowercase();
        if let Ok(code) = normalized.parse::<i64>() {
            return Self::try_from(code).map_err(|_| ParseTaskStatusError(value.to_owned()));
        }
        let canonical = match normalized.as_str() {
            "pending" => "not_started",
            "done" => "completed",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == canonical)
            .ok_or_else(|| ParseTaskStatusError(value.to_owned()))
    }
}

impl From<TaskStatus> for u8 {
    fn from(value: TaskStatus) -> Self {
        value.code()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion percentage in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Progress(u8);

impl Progress {
    /// No work done.
    pub const ZERO: Self = Self(0);
    /// All work done.
    pub const COMPLETE: Self = Self(100);

    /// Creates a validated progress value.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::ProgressOutOfRange`] when the value is
    /// negative or greater than 100.
    pub fn new(value: i64) -> Result<Self, TaskDomainError> {
        u8::try_from(value)
            .ok()
            .filter(|percent| *percent <= Self::COMPLETE.0)
            .map(Self)
            .ok_or(TaskDomainError::ProgressOutOfRange(value))
    }

    /// Returns the percentage.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns `true` at 100%.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.0 == Self::COMPLETE.0
    }
}

impl TryFrom<i64> for Progress {
    type Error = TaskDomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Progress> for u8 {
    fn from(value: Progress) -> Self {
        value.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Mutable execution state attached one-to-one to a task.
///
/// Every mutation increments [`Status::version`], which stores use for
/// compare-and-swap writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PersistedStatusData")]
pub struct Status {
    id: TaskId,
    status: TaskStatus,
    progress: Progress,
    start_time: Option<DateTime<Utc>>,
    update_time: Option<DateTime<Utc>>,
    enabled: bool,
    worker: Option<WorkerId>,
    version: u64,
}

/// Parameter object for reconstructing a persisted status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedStatusData {
    /// Identifier of the owning task.
    pub id: TaskId,
    /// Persisted lifecycle status.
    #[serde(default = "not_started")]
    pub status: TaskStatus,
    /// Persisted progress.
    #[serde(default)]
    pub progress: Progress,
    /// Persisted start timestamp.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Persisted latest mutation timestamp.
    #[serde(default)]
    pub update_time: Option<DateTime<Utc>>,
    /// Whether the task may be selected.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Worker that claimed the task.
    #[serde(default)]
    pub worker: Option<WorkerId>,
    /// Optimistic-concurrency stamp.
    #[serde(default)]
    pub version: u64,
}

const fn not_started() -> TaskStatus {
    TaskStatus::NotStarted
}

const fn enabled_by_default() -> bool {
    true
}

impl From<PersistedStatusData> for Status {
    fn from(value: PersistedStatusData) -> Self {
        Self::from_persisted(value)
    }
}

impl Status {
    /// Creates the implicit status of a freshly created task.
    #[must_use]
    pub const fn new(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::NotStarted,
            progress: Progress::ZERO,
            start_time: None,
            update_time: None,
            enabled: true,
            worker: None,
            version: 0,
        }
    }

    /// Reconstructs a status from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedStatusData) -> Self {
        Self {
            id: data.id,
            status: data.status,
            progress: data.progress,
            start_time: data.start_time,
            update_time: data.update_time,
            enabled: data.enabled,
            worker: data.worker,
            version: data.version,
        }
    }

    /// Returns the identifier shared with the task.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the current progress.
    #[must_use]
    pub const fn progress(&self) -> Progress {
        self.progress
    }

    /// Returns when work first started.
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Returns when the status last changed.
    #[must_use]
    pub const fn update_time(&self) -> Option<DateTime<Utc>> {
        self.update_time
    }

    /// Returns whether the task may be selected.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the worker that claimed the task.
    #[must_use]
    pub const fn worker(&self) -> Option<&WorkerId> {
        self.worker.as_ref()
    }

    /// Returns the optimistic-concurrency stamp.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns whether `worker` may claim this task.
    ///
    /// Disabled and terminal tasks are never claimable. An in-progress task
    /// is claimable when no worker owns it or when `worker` already does.
    #[must_use]
    pub fn is_claimable_by(&self, worker: &WorkerId) -> bool {
        if !self.enabled {
            return false;
        }
        match self.status {
            TaskStatus::NotStarted => true,
            TaskStatus::InProgress => self.worker.as_ref().is_none_or(|owner| owner == worker),
            TaskStatus::Completed | TaskStatus::Error => false,
        }
    }

    /// Moves a not-started task into progress.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task
    /// has not started.
    pub fn start(
        &mut self,
        worker: Option<WorkerId>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if self.status != TaskStatus::NotStarted {
            return Err(self.rejected(TaskStatus::InProgress));
        }
        let now = clock.utc();
        self.status = TaskStatus::InProgress;
        self.progress = Progress::ZERO;
        self.worker = worker;
        self.mark_started(now);
        self.touch(now);
        Ok(())
    }

    /// Records ownership of an in-progress task that no worker owns.
    ///
    /// Status and progress are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task
    /// is in progress.
    pub fn adopt(&mut self, worker: WorkerId, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if self.status != TaskStatus::InProgress {
            return Err(self.rejected(TaskStatus::InProgress));
        }
        let now = clock.utc();
        self.worker = Some(worker);
        self.mark_started(now);
        self.touch(now);
        Ok(())
    }

    /// Drops the worker recorded on an in-progress task so any worker can
    /// adopt it.
    ///
    /// Status and progress are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] unless the task
    /// is in progress.
    pub fn release(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if self.status != TaskStatus::InProgress {
            return Err(self.rejected(TaskStatus::InProgress));
        }
        self.worker = None;
        self.touch(clock.utc());
        Ok(())
    }

    /// Records a progress report.
    ///
    /// A not-started task is promoted to in progress. Without an override,
    /// reaching 100% completes the task; an override replaces the automatic
    /// promotion but must still be a permitted transition.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the task is
    /// terminal or the override is not reachable.
    pub fn record_progress(
        &mut self,
        progress: Progress,
        status_override: Option<TaskStatus>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let automatic = if progress.is_complete() {
            TaskStatus::Completed
        } else {
            TaskStatus::InProgress
        };
        let requested = status_override.unwrap_or(automatic);
        if self.status.is_terminal() {
            return Err(self.rejected(requested));
        }

        let promoted = match self.status {
            TaskStatus::NotStarted => TaskStatus::InProgress,
            other => other,
        };
        if requested != promoted && !promoted.can_transition_to(requested) {
            return Err(self.rejected(requested));
        }

        let now = clock.utc();
        self.status = requested;
        self.progress = progress;
        self.mark_started(now);
        self.touch(now);
        Ok(())
    }

    /// Marks the task as failed without altering progress.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the task is
    /// already terminal.
    pub fn mark_error(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(TaskStatus::Error) {
            return Err(self.rejected(TaskStatus::Error));
        }
        let now = clock.utc();
        self.status = TaskStatus::Error;
        self.mark_started(now);
        self.touch(now);
        Ok(())
    }

    /// Includes the task in, or excludes it from, selection.
    pub fn set_enabled(&mut self, enabled: bool, clock: &impl Clock) {
        self.enabled = enabled;
        self.touch(clock.utc());
    }

    fn rejected(&self, to: TaskStatus) -> TaskDomainError {
        TaskDomainError::InvalidStateTransition {
            task_id: self.id,
            from: self.status,
            to,
        }
    }

    /// Sets the start time once; later calls keep the original value.
    fn mark_started(&mut self, now: DateTime<Utc>) {
        self.start_time.get_or_insert(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.update_time = Some(now);
        self.version = self.version.saturating_add(1);
    }
}
