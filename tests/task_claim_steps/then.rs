//! Then steps for task claim BDD scenarios.

use super::world::{TaskClaimWorld, run_async};
use rstest_bdd_macros::then;
use task_lifecycle::task::domain::{TaskStatus, WorkerId};

#[then(r#"worker "{worker}" received task "{name}""#)]
fn worker_received(world: &TaskClaimWorld, worker: String, name: String) -> Result<(), eyre::Report> {
    let expected = world.task_id(&name)?;
    let claimed = world
        .claims_by_worker
        .get(&worker)
        .ok_or_else(|| eyre::eyre!("worker {worker} has not claimed"))?
        .as_ref()
        .ok_or_else(|| eyre::eyre!("worker {worker} received no task"))?;

    if claimed.id() != expected {
        return Err(eyre::eyre!(
            "expected worker {worker} to hold task {expected}, got {}",
            claimed.id()
        ));
    }
    if claimed.status().worker().map(WorkerId::as_str) != Some(worker.as_str()) {
        return Err(eyre::eyre!("task {expected} is not owned by {worker}"));
    }
    Ok(())
}

#[then(r#"worker "{worker}" received no task"#)]
fn worker_received_nothing(world: &TaskClaimWorld, worker: String) -> Result<(), eyre::Report> {
    match world.claims_by_worker.get(&worker) {
        Some(None) => Ok(()),
        Some(Some(record)) => Err(eyre::eyre!(
            "worker {worker} unexpectedly received task {}",
            record.id()
        )),
        None => Err(eyre::eyre!("worker {worker} has not claimed")),
    }
}

#[then(r#"task "{name}" is "{status}""#)]
fn task_status_is(world: &TaskClaimWorld, name: String, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let id = world.task_id(&name)?;
    let current = run_async(world.service.get_status(id))?;

    if current.status() != expected {
        return Err(eyre::eyre!(
            "expected task {name} to be {expected}, found {}",
            current.status()
        ));
    }
    Ok(())
}

#[then(r#"task "{name}" has progress {progress:u8}"#)]
fn task_has_progress(world: &TaskClaimWorld, name: String, progress: u8) -> Result<(), eyre::Report> {
    let id = world.task_id(&name)?;
    let current = run_async(world.service.get_status(id))?;

    if current.progress().value() != progress {
        return Err(eyre::eyre!(
            "expected progress {progress}, found {}",
            current.progress()
        ));
    }
    Ok(())
}

#[then(r#"the last operation fails with kind "{kind}""#)]
fn last_operation_fails(world: &TaskClaimWorld, kind: String) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no operation recorded"))?;

    match result {
        Err(err) if err.kind().as_str() == kind => Ok(()),
        other => Err(eyre::eyre!("expected a {kind} failure, got {other:?}")),
    }
}
