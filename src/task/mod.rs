//! Task lifecycle management.
//!
//! Tasks are immutable work descriptions; each owns exactly one mutable
//! status record tracking its position in the lifecycle
//! `not_started -> in_progress -> completed | error`. Workers claim tasks
//! through [`services::TaskLifecycleService::claim_next`], which starts or
//! adopts the earliest-created claimable task with an optimistic
//! compare-and-swap on the status version. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
