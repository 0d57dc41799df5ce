//! Executes parsed commands against a lifecycle service and renders the
//! plain-text output.

use crate::cli::Command;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use eyre::{Result, WrapErr};
use mockable::Clock;
use std::io::{self, Write};
use task_lifecycle::task::{
    domain::{Status, Task, TaskId, TaskKind, TaskRecord, WorkerId},
    ports::{RecordStore, VersionedStore},
    services::{CreateTaskRequest, TaskLifecycleError, TaskLifecycleService, TaskQuery},
};
use tracing::info;

/// Runs `command`, writing its output to `out`.
///
/// Lifecycle failures are returned as [`TaskLifecycleError`] inside the
/// report so the caller can derive an exit code from their kind.
pub async fn execute<T, S, C>(
    service: &TaskLifecycleService<T, S, C>,
    command: Command,
    out: &mut impl Write,
) -> Result<()>
where
    T: RecordStore<Task>,
    S: VersionedStore<Status>,
    C: Clock + Send + Sync,
{
    match command {
        Command::List {
            kind,
            status,
            enabled,
        } => {
            let mut query = TaskQuery::all();
            if let Some(value) = kind {
                query = query.with_kind(TaskKind::new(value));
            }
            if let Some(value) = status {
                query = query.with_status(value);
            }
            if let Some(value) = enabled {
                query = query.with_enabled(value);
            }
            let records = service.list_tasks(&query).await?;
            write_task_table(out, &records)?;
        }
        Command::Status => {
            let statuses = service.list_statuses().await?;
            write_status_table(out, &statuses)?;
        }
        Command::Info { id } => {
            let record = service.get_task(TaskId::new(id)).await?;
            write_record(out, &record)?;
        }
        Command::Add {
            name,
            kind,
            data,
            desc,
        } => {
            let payload = resolve_payload(data)?;
            let mut request = CreateTaskRequest::new(name, TaskKind::new(kind), payload);
            if let Some(description) = desc {
                request = request.with_description(description);
            }
            let record = service.create_task(request).await?;
            info!(task_id = %record.id(), "created task");
            writeln!(out, "created task {}", record.id())?;
        }
        Command::Start { id, worker } => {
            let owner = worker
                .map(WorkerId::new)
                .transpose()
                .map_err(TaskLifecycleError::from)?;
            let status = service.start(TaskId::new(id), owner).await?;
            info!(task_id = id, "started task");
            write_status_line(out, &status)?;
        }
        Command::Update {
            id,
            progress,
            status,
        } => {
            let updated = service
                .update_progress(TaskId::new(id), progress, status)
                .await?;
            info!(task_id = id, progress, "recorded progress");
            write_status_line(out, &updated)?;
        }
        Command::Complete { id } => {
            let status = service.done(TaskId::new(id)).await?;
            info!(task_id = id, "completed task");
            write_status_line(out, &status)?;
        }
        Command::Fail { id } => {
            let status = service.mark_error(TaskId::new(id)).await?;
            info!(task_id = id, "marked task as failed");
            write_status_line(out, &status)?;
        }
        Command::Next { worker } => {
            let claimant = WorkerId::new(worker).map_err(TaskLifecycleError::from)?;
            match service.claim_next(&claimant).await? {
                Some(record) => {
                    info!(task_id = %record.id(), worker = %claimant, "claimed task");
                    writeln!(
                        out,
                        "claimed task {} ({}) for {claimant}",
                        record.id(),
                        record.task().name()
                    )?;
                }
                None => writeln!(out, "no claimable task")?,
            }
        }
        Command::Release { id } => {
            let status = service.release(TaskId::new(id)).await?;
            info!(task_id = id, "released task");
            write_status_line(out, &status)?;
        }
        Command::Enable { id } => {
            service.set_enabled(TaskId::new(id), true).await?;
            writeln!(out, "task {id} enabled")?;
        }
        Command::Disable { id } => {
            service.set_enabled(TaskId::new(id), false).await?;
            writeln!(out, "task {id} disabled")?;
        }
        Command::Delete { id } => {
            let task_id = TaskId::new(id);
            if !service.delete_task(task_id).await? {
                return Err(TaskLifecycleError::NotFound(task_id).into());
            }
            info!(task_id = id, "deleted task");
            writeln!(out, "deleted task {id}")?;
        }
    }
    Ok(())
}

/// Reads the payload from a file when `data` names one, otherwise returns
/// `data` itself.
fn resolve_payload(data: String) -> Result<String> {
    match read_payload_file(Utf8Path::new(&data)) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            Err(err).wrap_err_with(|| format!("failed to read payload file {data}"))
        }
        Err(_) => Ok(data),
    }
}

fn read_payload_file(path: &Utf8Path) -> io::Result<String> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
    Dir::open_ambient_dir(parent, ambient_authority())?.read_to_string(file_name)
}

fn write_task_table(out: &mut impl Write, records: &[TaskRecord]) -> io::Result<()> {
    writeln!(
        out,
        "{:>6}  {:>6}  {:<11}  {:>8}  {:<7}  {:<12}  NAME",
        "ID", "KIND", "STATUS", "PROGRESS", "ENABLED", "WORKER"
    )?;
    for record in records {
        let status = record.status();
        writeln!(
            out,
            "{:>6}  {:>6}  {:<11}  {:>8}  {:<7}  {:<12}  {}",
            record.id().value(),
            record.task().kind().value(),
            status.status().as_str(),
            status.progress().to_string(),
            status.is_enabled(),
            status.worker().map_or("-", WorkerId::as_str),
            record.task().name()
        )?;
    }
    Ok(())
}

fn write_status_table(out: &mut impl Write, statuses: &[Status]) -> io::Result<()> {
    writeln!(
        out,
        "{:>6}  {:<11}  {:>8}  {:<7}  {:<12}  UPDATED",
        "ID", "STATUS", "PROGRESS", "ENABLED", "WORKER"
    )?;
    for status in statuses {
        writeln!(
            out,
            "{:>6}  {:<11}  {:>8}  {:<7}  {:<12}  {}",
            status.id().value(),
            status.status().as_str(),
            status.progress().to_string(),
            status.is_enabled(),
            status.worker().map_or("-", WorkerId::as_str),
            status
                .update_time()
                .map_or_else(|| "-".to_owned(), |time| time.to_rfc3339())
        )?;
    }
    Ok(())
}

fn write_record(out: &mut impl Write, record: &TaskRecord) -> io::Result<()> {
    let task = record.task();
    let status = record.status();
    writeln!(out, "id:          {}", task.id())?;
    writeln!(out, "name:        {}", task.name())?;
    writeln!(out, "kind:        {}", task.kind())?;
    writeln!(out, "created:     {}", task.created_at().to_rfc3339())?;
    if let Some(description) = task.description() {
        writeln!(out, "description: {description}")?;
    }
    writeln!(out, "payload:     {}", task.payload())?;
    writeln!(out, "status:      {}", status.status())?;
    writeln!(out, "progress:    {}", status.progress())?;
    writeln!(out, "enabled:     {}", status.is_enabled())?;
    if let Some(worker) = status.worker() {
        writeln!(out, "worker:      {worker}")?;
    }
    if let Some(started) = status.start_time() {
        writeln!(out, "started:     {}", started.to_rfc3339())?;
    }
    if let Some(updated) = status.update_time() {
        writeln!(out, "updated:     {}", updated.to_rfc3339())?;
    }
    Ok(())
}

fn write_status_line(out: &mut impl Write, status: &Status) -> io::Result<()> {
    writeln!(
        out,
        "task {} {} {}",
        status.id(),
        status.status(),
        status.progress()
    )
}
