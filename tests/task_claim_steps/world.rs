//! Shared world state for task claim BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use task_lifecycle::task::{
    adapters::memory::InMemoryRecordStore,
    domain::{Status, Task, TaskId, TaskRecord},
    services::{TaskLifecycleError, TaskLifecycleService},
};

/// Service type used by the BDD world.
pub type TestTaskService =
    TaskLifecycleService<InMemoryRecordStore<Task>, InMemoryRecordStore<Status>, DefaultClock>;

/// Scenario world for claim and progress behaviour tests.
pub struct TaskClaimWorld {
    pub service: TestTaskService,
    pub tasks_by_name: HashMap<String, TaskId>,
    pub claims_by_worker: HashMap<String, Option<TaskRecord>>,
    pub last_result: Option<Result<Status, TaskLifecycleError>>,
}

impl TaskClaimWorld {
    /// Creates a world backed by empty in-memory stores.
    #[must_use]
    pub fn new() -> Self {
        let service = TaskLifecycleService::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(DefaultClock),
        );

        Self {
            service,
            tasks_by_name: HashMap::new(),
            claims_by_worker: HashMap::new(),
            last_result: None,
        }
    }

    /// Looks up a task created earlier in the scenario.
    pub fn task_id(&self, name: &str) -> Result<TaskId, eyre::Report> {
        self.tasks_by_name
            .get(name)
            .copied()
            .ok_or_else(|| eyre::eyre!("no task named {name} in scenario world"))
    }
}

impl Default for TaskClaimWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskClaimWorld {
    TaskClaimWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
