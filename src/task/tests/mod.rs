//! Unit tests for the task lifecycle module.

mod domain_tests;
mod state_transition_tests;
