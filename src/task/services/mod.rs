//! Application services for task lifecycle orchestration.

mod error;
mod lifecycle;

pub use error::{ErrorKind, TaskLifecycleError, TaskLifecycleResult};
pub use lifecycle::{CreateTaskRequest, LifecycleConfig, TaskLifecycleService, TaskQuery};
