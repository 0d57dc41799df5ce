//! Behaviour tests for claiming tasks and reporting progress.

#[path = "task_claim_steps/mod.rs"]
mod task_claim_steps_defs;

use rstest_bdd_macros::scenario;
use task_claim_steps_defs::world::{TaskClaimWorld, world};

#[scenario(
    path = "tests/features/task_claim.feature",
    name = "Claim the earliest enabled task"
)]
#[tokio::test(flavor = "multi_thread")]
async fn claim_earliest_enabled_task(world: TaskClaimWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/task_claim.feature", name = "Skip disabled tasks")]
#[tokio::test(flavor = "multi_thread")]
async fn skip_disabled_tasks(world: TaskClaimWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_claim.feature",
    name = "Competing workers receive different tasks"
)]
#[tokio::test(flavor = "multi_thread")]
async fn competing_workers_receive_different_tasks(world: TaskClaimWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_claim.feature",
    name = "Report progress through to completion"
)]
#[tokio::test(flavor = "multi_thread")]
async fn report_progress_to_completion(world: TaskClaimWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_claim.feature",
    name = "Reject progress on a completed task"
)]
#[tokio::test(flavor = "multi_thread")]
async fn reject_progress_on_completed_task(world: TaskClaimWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/task_claim.feature",
    name = "Reject out-of-range progress"
)]
#[tokio::test(flavor = "multi_thread")]
async fn reject_out_of_range_progress(world: TaskClaimWorld) {
    let _ = world;
}
