//! Lifecycle engine: task creation, claim selection, and status transitions.

use super::error::{TaskLifecycleError, TaskLifecycleResult};
use crate::task::{
    domain::{
        Progress, Status, Task, TaskDomainError, TaskId, TaskKind, TaskRecord, TaskStatus,
        WorkerId,
    },
    ports::{RecordStore, VersionedStore},
};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    name: String,
    kind: TaskKind,
    payload: String,
    description: Option<String>,
}

impl CreateTaskRequest {
    /// Creates a request with the required task fields.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TaskKind, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            payload: payload.into(),
            description: None,
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Filters applied by [`TaskLifecycleService::list_tasks`].
///
/// Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskQuery {
    kind: Option<TaskKind>,
    status: Option<TaskStatus>,
    enabled: Option<bool>,
}

impl TaskQuery {
    /// Creates a query matching every task.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts results to one task kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts results to one lifecycle status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts results by the selection flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Returns whether `record` satisfies every filter.
    #[must_use]
    pub fn matches(&self, record: &TaskRecord) -> bool {
        self.kind.is_none_or(|kind| record.task().kind() == kind)
            && self.status.is_none_or(|status| record.status().status() == status)
            && self.enabled.is_none_or(|enabled| record.status().is_enabled() == enabled)
    }
}

/// Tuning for the optimistic concurrency loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Retries after a lost compare-and-swap before reporting a conflict.
    pub max_conflict_retries: u32,
}

impl LifecycleConfig {
    const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 8;

    const fn attempts(self) -> u32 {
        self.max_conflict_retries.saturating_add(1)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: Self::DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

/// Task lifecycle engine.
///
/// Every status mutation is a read, a domain transition on a copy, and a
/// compare-and-swap on the status version, retried on lost races. Calls
/// never block on each other beyond the store's own per-key atomicity.
#[derive(Clone)]
pub struct TaskLifecycleService<T, S, C>
where
    T: RecordStore<Task>,
    S: VersionedStore<Status>,
    C: Clock + Send + Sync,
{
    tasks: Arc<T>,
    statuses: Arc<S>,
    clock: Arc<C>,
    config: LifecycleConfig,
}

impl<T, S, C> TaskLifecycleService<T, S, C>
where
    T: RecordStore<Task>,
    S: VersionedStore<Status>,
    C: Clock + Send + Sync,
{
    /// Creates a lifecycle engine with default tuning.
    #[must_use]
    pub fn new(tasks: Arc<T>, statuses: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            tasks,
            statuses,
            clock,
            config: LifecycleConfig::default(),
        }
    }

    /// Replaces the concurrency tuning.
    #[must_use]
    pub const fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Creates a task and its implicit not-started status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] when the name is blank, or
    /// store errors.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskLifecycleResult<TaskRecord> {
        let id = self.tasks.next_id().await?;
        let mut task = Task::new(id, request.name, request.kind, request.payload, &*self.clock)?;
        if let Some(description) = request.description {
            task = task.with_description(description);
        }
        let status = Status::new(id);

        // The task goes first so a status never references a missing task.
        self.tasks.put(&task).await?;
        if let Err(err) = self.statuses.put(&status).await {
            // Roll back; the status error is the one reported.
            let _removed = self.tasks.delete(id).await;
            return Err(err.into());
        }
        Ok(TaskRecord::new(task, status))
    }

    /// Fetches a task together with its status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown identifiers and
    /// [`TaskLifecycleError::MissingStatus`] when the status record is gone.
    pub async fn get_task(&self, id: TaskId) -> TaskLifecycleResult<TaskRecord> {
        let task = self
            .tasks
            .get(id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(id))?;
        let status = self
            .statuses
            .get(id)
            .await?
            .ok_or(TaskLifecycleError::MissingStatus(id))?;
        Ok(TaskRecord::new(task, status))
    }

    /// Fetches a status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown identifiers.
    pub async fn get_status(&self, id: TaskId) -> TaskLifecycleResult<Status> {
        self.statuses
            .get(id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(id))
    }

    /// Lists tasks matching `query` in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::MissingStatus`] when a task has no
    /// status record, or store errors.
    pub async fn list_tasks(&self, query: &TaskQuery) -> TaskLifecycleResult<Vec<TaskRecord>> {
        let tasks = self.tasks.list().await?;
        let mut statuses: HashMap<TaskId, Status> = self
            .statuses
            .list()
            .await?
            .into_iter()
            .map(|status| (status.id(), status))
            .collect();

        let mut records = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = task.id();
            let status = match statuses.remove(&id) {
                Some(status) => status,
                None => match self.status_of_listed_task(id).await? {
                    Some(status) => status,
                    None => continue,
                },
            };
            let record = TaskRecord::new(task, status);
            if query.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Lists every status in creation order.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn list_statuses(&self) -> TaskLifecycleResult<Vec<Status>> {
        Ok(self.statuses.list().await?)
    }

    /// Deletes a task and its status.
    ///
    /// Returns `false` when neither record existed. When the task cannot be
    /// removed, the status is put back so the pair stays consistent.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn delete_task(&self, id: TaskId) -> TaskLifecycleResult<bool> {
        let previous = self.statuses.get(id).await?;
        // The status goes first so it never outlives its task.
        let status_removed = self.statuses.delete(id).await?;
        match self.tasks.delete(id).await {
            Ok(task_removed) => Ok(status_removed || task_removed),
            Err(err) => {
                if let Some(status) = previous.filter(|_| status_removed) {
                    let _restored = self.statuses.put(&status).await;
                }
                Err(err.into())
            }
        }
    }

    /// Claims the earliest-created task `worker` may run.
    ///
    /// A not-started task is started for `worker` in the same
    /// compare-and-swap that claims it. An in-progress task nobody owns is
    /// adopted by `worker`; one already owned by `worker` is returned as is.
    /// Returns `None` when nothing is claimable.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::MissingTask`] when a claimable status
    /// references a missing task, [`TaskLifecycleError::Conflict`] when a
    /// candidate keeps changing under contention, or store errors.
    pub async fn claim_next(&self, worker: &WorkerId) -> TaskLifecycleResult<Option<TaskRecord>> {
        for candidate in self.statuses.list().await? {
            if let Some(record) = self.try_claim(candidate, worker).await? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Moves a not-started task into progress.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown identifiers and
    /// [`TaskLifecycleError::Domain`] when the task has already started.
    pub async fn start(
        &self,
        id: TaskId,
        worker: Option<WorkerId>,
    ) -> TaskLifecycleResult<Status> {
        self.mutate(id, move |status, clock| status.start(worker.clone(), clock))
            .await
    }

    /// Clears the owner of an in-progress task so the next
    /// [`Self::claim_next`] by any worker can adopt it.
    ///
    /// This is how a task held by a worker that will not come back under
    /// the same identifier is recovered.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown identifiers and
    /// [`TaskLifecycleError::Domain`] unless the task is in progress.
    pub async fn release(&self, id: TaskId) -> TaskLifecycleResult<Status> {
        self.mutate(id, |status, clock| status.release(clock)).await
    }

    /// Records a progress report, optionally forcing the resulting status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::ProgressOutOfRange`] before touching the
    /// store when `progress` is outside `0..=100`,
    /// [`TaskLifecycleError::NotFound`] for unknown identifiers, and
    /// [`TaskDomainError::InvalidStateTransition`] for terminal tasks or
    /// unreachable overrides.
    pub async fn update_progress(
        &self,
        id: TaskId,
        progress: i64,
        status_override: Option<TaskStatus>,
    ) -> TaskLifecycleResult<Status> {
        let validated = Progress::new(progress)?;
        self.mutate(id, |status, clock| {
            status.record_progress(validated, status_override, clock)
        })
        .await
    }

    /// Completes a task at 100%.
    ///
    /// # Errors
    ///
    /// As [`Self::update_progress`].
    pub async fn done(&self, id: TaskId) -> TaskLifecycleResult<Status> {
        self.update_progress(
            id,
            i64::from(Progress::COMPLETE.value()),
            Some(TaskStatus::Completed),
        )
        .await
    }

    /// Marks a task as failed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown identifiers and
    /// [`TaskDomainError::InvalidStateTransition`] for terminal tasks.
    pub async fn mark_error(&self, id: TaskId) -> TaskLifecycleResult<Status> {
        self.mutate(id, |status, clock| status.mark_error(clock))
            .await
    }

    /// Includes a task in, or excludes it from, claim selection.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown identifiers.
    pub async fn set_enabled(&self, id: TaskId, enabled: bool) -> TaskLifecycleResult<Status> {
        self.mutate(id, |status, clock| {
            status.set_enabled(enabled, clock);
            Ok(())
        })
        .await
    }

    async fn mutate<F>(&self, id: TaskId, mut apply: F) -> TaskLifecycleResult<Status>
    where
        F: FnMut(&mut Status, &C) -> Result<(), TaskDomainError> + Send,
    {
        let attempts = self.config.attempts();
        for _ in 0..attempts {
            let current = self.get_status(id).await?;
            let mut next = current.clone();
            apply(&mut next, self.clock.as_ref())?;
            if self
                .statuses
                .compare_and_put(&next, current.version())
                .await?
            {
                return Ok(next);
            }
        }
        Err(TaskLifecycleError::Conflict {
            task_id: id,
            attempts,
        })
    }

    async fn try_claim(
        &self,
        candidate: Status,
        worker: &WorkerId,
    ) -> TaskLifecycleResult<Option<TaskRecord>> {
        if !candidate.is_claimable_by(worker) {
            return Ok(None);
        }
        let id = candidate.id();
        let Some(task) = self.tasks.get(id).await? else {
            return self.report_missing_task(id).await;
        };

        let attempts = self.config.attempts();
        let mut current = candidate;
        for _ in 0..attempts {
            if !current.is_claimable_by(worker) {
                return Ok(None);
            }
            let mut claimed = current.clone();
            match (current.status(), current.worker()) {
                (TaskStatus::NotStarted, _) => claimed.start(Some(worker.clone()), &*self.clock)?,
                (_, None) => claimed.adopt(worker.clone(), &*self.clock)?,
                (_, Some(_)) => return Ok(Some(TaskRecord::new(task, current))),
            }
            if self
                .statuses
                .compare_and_put(&claimed, current.version())
                .await?
            {
                return Ok(Some(TaskRecord::new(task, claimed)));
            }
            match self.statuses.get(id).await? {
                Some(latest) => current = latest,
                None => return Ok(None),
            }
        }
        Err(TaskLifecycleError::Conflict {
            task_id: id,
            attempts,
        })
    }

    /// Distinguishes a dangling status from a task deleted mid-scan.
    async fn report_missing_task(&self, id: TaskId) -> TaskLifecycleResult<Option<TaskRecord>> {
        if self.statuses.get(id).await?.is_some() {
            return Err(TaskLifecycleError::MissingTask(id));
        }
        Ok(None)
    }

    /// Re-reads the status of a listed task that had none in the snapshot.
    ///
    /// Returns `None` when the task itself was deleted in the meantime.
    async fn status_of_listed_task(&self, id: TaskId) -> TaskLifecycleResult<Option<Status>> {
        if let Some(status) = self.statuses.get(id).await? {
            return Ok(Some(status));
        }
        if self.tasks.get(id).await?.is_none() {
            return Ok(None);
        }
        Err(TaskLifecycleError::MissingStatus(id))
    }
}
