//! Domain model for task lifecycle management.
//!
//! A [`Task`] describes a unit of work and never changes state; the matching
//! [`Status`] carries the lifecycle and is mutated only through its
//! transition methods, which enforce the [`TaskStatus`] state machine.

mod error;
mod ids;
mod status;
mod task;

pub use error::{ParseTaskStatusError, TaskDomainError};
pub use ids::{MAX_WORKER_ID_LENGTH, TaskId, TaskKind, WorkerId};
pub use status::{PersistedStatusData, Progress, Status, TaskStatus};
pub use task::{MAX_NAME_LENGTH, PersistedTaskData, Task, TaskRecord};
