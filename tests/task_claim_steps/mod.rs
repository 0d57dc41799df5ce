//! Step definitions for task claim BDD scenarios.

mod given;
mod then;
mod when;
pub mod world;
