//! Given steps for task claim BDD scenarios.

use super::world::{TaskClaimWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use task_lifecycle::task::{domain::TaskKind, services::CreateTaskRequest};

#[given(r#"a task named "{name}" of kind {kind:i64}"#)]
fn task_named(world: &mut TaskClaimWorld, name: String, kind: i64) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new(name.clone(), TaskKind::new(kind), "{}");
    let created = run_async(world.service.create_task(request))
        .wrap_err("create task for claim scenario")?;
    world.tasks_by_name.insert(name, created.id());
    Ok(())
}

#[given(r#"task "{name}" is disabled"#)]
fn task_disabled(world: &mut TaskClaimWorld, name: String) -> Result<(), eyre::Report> {
    let id = world.task_id(&name)?;
    run_async(world.service.set_enabled(id, false)).wrap_err("disable task in scenario setup")?;
    Ok(())
}

#[given(r#"task "{name}" has been completed"#)]
fn task_completed(world: &mut TaskClaimWorld, name: String) -> Result<(), eyre::Report> {
    let id = world.task_id(&name)?;
    run_async(world.service.done(id)).wrap_err("complete task in scenario setup")?;
    Ok(())
}
