//! `taskctl`: command-line front end for the task lifecycle engine.
//!
//! Usage:
//!
//! ```text
//! taskctl [--config PATH] [--backend memory|file|postgres] <command> [args]
//! ```
//!
//! Configuration is layered as defaults, `taskctl.toml` (or `--config`),
//! `TASKCTL_*` environment variables (a `.env` file is honoured), and the
//! global flags. Logging goes to stderr and is filtered by `TASKCTL_LOG`,
//! falling back to `RUST_LOG`.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Command};
use eyre::{Result, WrapErr};
use mockable::DefaultClock;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use task_lifecycle::config::{Backend, Config};
use task_lifecycle::task::{
    adapters::{file::JsonFileRecordStore, memory::InMemoryRecordStore, postgres::PostgresRecordStore},
    domain::{Status, Task},
    services::{ErrorKind, TaskLifecycleError, TaskLifecycleService},
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TASKCTL_LOG";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            // Nothing useful remains to do if stderr itself is gone.
            let _ignored = writeln!(io::stderr().lock(), "taskctl: {report:#}");
            ExitCode::from(exit_code(&report))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<()> {
    match dotenvy::dotenv() {
        Err(err) if !err.not_found() => return Err(err).wrap_err("failed to load .env file"),
        _ => {}
    }
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    debug!(backend = %config.store.backend, "resolved configuration");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start async runtime")?;
    runtime.block_on(dispatch(&config, cli.command))
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env(std::env::vars())?;
    cli.apply_overrides(&mut config);
    Ok(config)
}

async fn dispatch(config: &Config, command: Command) -> Result<()> {
    let clock = Arc::new(DefaultClock);
    let mut stdout = io::stdout().lock();
    match config.store.backend {
        Backend::Memory => {
            let service = TaskLifecycleService::new(
                Arc::new(InMemoryRecordStore::<Task>::new()),
                Arc::new(InMemoryRecordStore::<Status>::new()),
                clock,
            )
            .with_config(config.lifecycle);
            commands::execute(&service, command, &mut stdout).await
        }
        Backend::File => {
            let store = &config.store;
            let tasks = JsonFileRecordStore::<Task>::open(&store.data_dir, &store.task_collection)?;
            let statuses =
                JsonFileRecordStore::<Status>::open(&store.data_dir, &store.status_collection)?;
            let service = TaskLifecycleService::new(Arc::new(tasks), Arc::new(statuses), clock)
                .with_config(config.lifecycle);
            commands::execute(&service, command, &mut stdout).await
        }
        Backend::Postgres => {
            let url = config.store.require_database_url()?;
            let store = Arc::new(PostgresRecordStore::connect(url)?);
            store.ensure_schema().await?;
            let service = TaskLifecycleService::new(Arc::clone(&store), store, clock)
                .with_config(config.lifecycle);
            commands::execute(&service, command, &mut stdout).await
        }
    }
}

/// Maps a failure to the process exit status.
///
/// Lifecycle errors are classified by kind; anything else (configuration,
/// I/O) exits with `1`.
fn exit_code(report: &eyre::Report) -> u8 {
    report
        .downcast_ref::<TaskLifecycleError>()
        .map_or(1, |err| kind_exit_code(err.kind()))
}

const fn kind_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::InvalidArgument => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::InvalidState => 4,
        ErrorKind::Conflict => 5,
    }
}
