//! Unit tests for status transition validation.

use crate::task::domain::{Progress, Status, TaskDomainError, TaskId, TaskStatus, WorkerId};
use eyre::{bail, ensure};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

#[fixture]
fn clock() -> DefaultClock {
    DefaultClock
}

#[fixture]
fn worker() -> WorkerId {
    WorkerId::new("worker-a").expect("valid worker")
}

fn status_in(state: TaskStatus, clock: &DefaultClock) -> eyre::Result<Status> {
    let mut status = Status::new(TaskId::new(1));
    match state {
        TaskStatus::NotStarted => {}
        TaskStatus::InProgress => status.start(None, clock)?,
        TaskStatus::Completed => {
            status.start(None, clock)?;
            status.record_progress(Progress::COMPLETE, None, clock)?;
        }
        TaskStatus::Error => status.mark_error(clock)?,
    }
    Ok(status)
}

#[rstest]
#[case(TaskStatus::NotStarted, TaskStatus::NotStarted, false)]
#[case(TaskStatus::NotStarted, TaskStatus::InProgress, true)]
#[case(TaskStatus::NotStarted, TaskStatus::Completed, false)]
#[case(TaskStatus::NotStarted, TaskStatus::Error, true)]
#[case(TaskStatus::InProgress, TaskStatus::NotStarted, false)]
#[case(TaskStatus::InProgress, TaskStatus::InProgress, false)]
#[case(TaskStatus::InProgress, TaskStatus::Completed, true)]
#[case(TaskStatus::InProgress, TaskStatus::Error, true)]
#[case(TaskStatus::Completed, TaskStatus::InProgress, false)]
#[case(TaskStatus::Completed, TaskStatus::Error, false)]
#[case(TaskStatus::Error, TaskStatus::InProgress, false)]
#[case(TaskStatus::Error, TaskStatus::Completed, false)]
fn transition_table(#[case] from: TaskStatus, #[case] to: TaskStatus, #[case] allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[rstest]
fn start_records_worker_and_times(clock: DefaultClock, worker: WorkerId) -> eyre::Result<()> {
    let mut status = Status::new(TaskId::new(1));

    status.start(Some(worker.clone()), &clock)?;

    ensure!(status.status() == TaskStatus::InProgress);
    ensure!(status.progress() == Progress::ZERO);
    ensure!(status.worker() == Some(&worker));
    ensure!(status.start_time().is_some());
    ensure!(status.update_time() == status.start_time());
    ensure!(status.version() == 1);
    Ok(())
}

#[rstest]
#[case(TaskStatus::InProgress)]
#[case(TaskStatus::Completed)]
#[case(TaskStatus::Error)]
fn start_requires_a_not_started_task(
    clock: DefaultClock,
    #[case] state: TaskStatus,
) -> eyre::Result<()> {
    let mut status = status_in(state, &clock)?;
    let before = status.clone();

    let Err(err) = status.start(None, &clock) else {
        bail!("start from {state} was accepted");
    };

    ensure!(matches!(err, TaskDomainError::InvalidStateTransition { from, .. } if from == state));
    ensure!(status == before, "rejected start mutated the status");
    Ok(())
}

#[rstest]
fn progress_promotes_a_not_started_task(clock: DefaultClock) -> eyre::Result<()> {
    let mut status = Status::new(TaskId::new(1));

    status.record_progress(Progress::new(10)?, None, &clock)?;

    ensure!(status.status() == TaskStatus::InProgress);
    ensure!(status.progress().value() == 10);
    ensure!(status.start_time().is_some());
    Ok(())
}

#[rstest]
fn full_progress_completes_the_task(clock: DefaultClock) -> eyre::Result<()> {
    let mut status = status_in(TaskStatus::InProgress, &clock)?;

    status.record_progress(Progress::COMPLETE, None, &clock)?;

    ensure!(status.status() == TaskStatus::Completed);
    Ok(())
}

#[rstest]
fn override_wins_over_automatic_completion(clock: DefaultClock) -> eyre::Result<()> {
    let mut status = status_in(TaskStatus::InProgress, &clock)?;

    status.record_progress(Progress::COMPLETE, Some(TaskStatus::InProgress), &clock)?;

    ensure!(status.status() == TaskStatus::InProgress);
    ensure!(status.progress() == Progress::COMPLETE);
    Ok(())
}

#[rstest]
fn override_can_fail_a_running_task(clock: DefaultClock) -> eyre::Result<()> {
    let mut status = status_in(TaskStatus::InProgress, &clock)?;

    status.record_progress(Progress::new(40)?, Some(TaskStatus::Error), &clock)?;

    ensure!(status.status() == TaskStatus::Error);
    ensure!(status.progress().value() == 40);
    Ok(())
}

#[rstest]
fn override_back_to_not_started_is_rejected(clock: DefaultClock) -> eyre::Result<()> {
    let mut status = status_in(TaskStatus::InProgress, &clock)?;

    let result = status.record_progress(Progress::new(5)?, Some(TaskStatus::NotStarted), &clock);

    ensure!(matches!(
        result,
        Err(TaskDomainError::InvalidStateTransition {
            to: TaskStatus::NotStarted,
            ..
        })
    ));
    Ok(())
}

#[rstest]
#[case(TaskStatus::Completed)]
#[case(TaskStatus::Error)]
fn terminal_statuses_reject_progress(
    clock: DefaultClock,
    #[case] state: TaskStatus,
) -> eyre::Result<()> {
    let mut status = status_in(state, &clock)?;

    ensure!(
        status
            .record_progress(Progress::new(50)?, None, &clock)
            .is_err()
    );
    ensure!(status.mark_error(&clock).is_err());
    ensure!(status.status() == state);
    Ok(())
}

#[rstest]
fn mark_error_keeps_progress_and_sets_start_time(clock: DefaultClock) -> eyre::Result<()> {
    let mut never_started = Status::new(TaskId::new(1));
    never_started.mark_error(&clock)?;
    ensure!(never_started.start_time().is_some());

    let mut running = status_in(TaskStatus::InProgress, &clock)?;
    running.record_progress(Progress::new(30)?, None, &clock)?;
    let started = running.start_time();
    running.mark_error(&clock)?;

    ensure!(running.status() == TaskStatus::Error);
    ensure!(running.progress().value() == 30);
    ensure!(running.start_time() == started, "start time was overwritten");
    Ok(())
}

#[rstest]
fn set_enabled_touches_only_selection_state(clock: DefaultClock) -> eyre::Result<()> {
    let mut status = status_in(TaskStatus::InProgress, &clock)?;
    let before = status.clone();

    status.set_enabled(false, &clock);

    ensure!(!status.is_enabled());
    ensure!(status.status() == before.status());
    ensure!(status.progress() == before.progress());
    ensure!(status.start_time() == before.start_time());
    ensure!(status.version() == before.version() + 1);
    Ok(())
}

#[rstest]
fn claimability_follows_status_flag_and_owner(
    clock: DefaultClock,
    worker: WorkerId,
) -> eyre::Result<()> {
    let other = WorkerId::new("worker-b")?;
    let idle = Status::new(TaskId::new(1));
    ensure!(idle.is_claimable_by(&worker));

    let mut disabled = Status::new(TaskId::new(2));
    disabled.set_enabled(false, &clock);
    ensure!(!disabled.is_claimable_by(&worker));

    let mut owned = Status::new(TaskId::new(3));
    owned.start(Some(worker.clone()), &clock)?;
    ensure!(owned.is_claimable_by(&worker));
    ensure!(!owned.is_claimable_by(&other));

    let orphaned = status_in(TaskStatus::InProgress, &clock)?;
    ensure!(orphaned.is_claimable_by(&other));

    let finished = status_in(TaskStatus::Completed, &clock)?;
    ensure!(!finished.is_claimable_by(&worker));
    Ok(())
}

#[rstest]
fn adopt_assigns_an_orphaned_task(clock: DefaultClock, worker: WorkerId) -> eyre::Result<()> {
    let mut status = status_in(TaskStatus::InProgress, &clock)?;
    status.record_progress(Progress::new(60)?, None, &clock)?;

    status.adopt(worker.clone(), &clock)?;

    ensure!(status.worker() == Some(&worker));
    ensure!(status.progress().value() == 60);
    ensure!(
        Status::new(TaskId::new(2))
            .adopt(worker, &clock)
            .is_err()
    );
    Ok(())
}

#[rstest]
fn release_clears_the_worker_only(clock: DefaultClock, worker: WorkerId) -> eyre::Result<()> {
    let mut status = Status::new(TaskId::new(1));
    status.start(Some(worker), &clock)?;
    status.record_progress(Progress::new(40)?, None, &clock)?;
    let before = status.clone();

    status.release(&clock)?;

    ensure!(status.worker().is_none());
    ensure!(status.status() == TaskStatus::InProgress);
    ensure!(status.progress() == before.progress());
    ensure!(status.start_time() == before.start_time());
    ensure!(status.version() == before.version() + 1);
    Ok(())
}
