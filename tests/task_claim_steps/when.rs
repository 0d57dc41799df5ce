//! When steps for task claim BDD scenarios.

use super::world::{TaskClaimWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use task_lifecycle::task::domain::WorkerId;

#[when(r#"worker "{worker}" claims the next task"#)]
fn worker_claims(world: &mut TaskClaimWorld, worker: String) -> Result<(), eyre::Report> {
    let claimant = WorkerId::new(worker.clone())?;
    let claimed = run_async(world.service.claim_next(&claimant)).wrap_err("claim next task")?;
    world.claims_by_worker.insert(worker, claimed);
    Ok(())
}

#[when(r#"progress {progress:i64} is reported for task "{name}""#)]
fn progress_reported(
    world: &mut TaskClaimWorld,
    progress: i64,
    name: String,
) -> Result<(), eyre::Report> {
    let id = world.task_id(&name)?;
    let result = run_async(world.service.update_progress(id, progress, None));
    world.last_result = Some(result);
    Ok(())
}
