//! Task lifecycle engine.
//!
//! A small persistence-backed engine tracking units of work ("tasks") and
//! their execution status through the lifecycle
//! `not_started -> in_progress -> completed | error`. Workers claim the
//! earliest-created claimable task, report progress, and finish or fail it.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: task, status, and transition rules with no storage concerns
//! - **Ports**: the keyed [`task::ports::RecordStore`] contract
//! - **Adapters**: in-memory, JSON file, and `PostgreSQL` stores
//! - **Services**: the [`task::services::TaskLifecycleService`] engine
//!
//! # Modules
//!
//! - [`task`]: lifecycle domain, storage ports, adapters, and services
//! - [`codec`]: JSON encoding with explicit failures
//! - [`config`]: layered configuration for the `taskctl` binary

pub mod codec;
pub mod config;
pub mod task;
