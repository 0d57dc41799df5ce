//! Command-line surface of `taskctl`.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use task_lifecycle::config::{Backend, Config};
use task_lifecycle::task::domain::{ParseTaskStatusError, TaskStatus};

/// Create, claim, and track tasks.
#[derive(Debug, Parser)]
#[command(name = "taskctl", version, about)]
pub struct Cli {
    /// Configuration file (defaults to `taskctl.toml` when present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Storage backend: memory, file, or postgres.
    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    /// Root directory of the file backend.
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<Utf8PathBuf>,

    /// Connection URL of the postgres backend.
    #[arg(long, global = true, value_name = "URL")]
    pub database_url: Option<String>,

    /// Collection holding tasks.
    #[arg(long, global = true, value_name = "NAME")]
    pub task_table: Option<String>,

    /// Collection holding statuses.
    #[arg(long, global = true, value_name = "NAME")]
    pub status_table: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Applies flag overrides, the highest-precedence configuration layer.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(backend) = self.backend {
            config.store.backend = backend;
        }
        if let Some(data_dir) = &self.data_dir {
            config.store.data_dir.clone_from(data_dir);
        }
        if let Some(url) = &self.database_url {
            config.store.database_url = Some(url.clone());
        }
        if let Some(name) = &self.task_table {
            config.store.task_collection.clone_from(name);
        }
        if let Some(name) = &self.status_table {
            config.store.status_collection.clone_from(name);
        }
    }
}

/// `taskctl` subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List tasks with their status.
    List {
        /// Only tasks of this kind.
        #[arg(long)]
        kind: Option<i64>,
        /// Only tasks in this status (code or name).
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
        /// Only enabled (`true`) or disabled (`false`) tasks.
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// List every status record.
    Status,
    /// Show one task and its status.
    Info {
        /// Task identifier.
        id: u64,
    },
    /// Create a task.
    Add {
        /// Task name.
        #[arg(long)]
        name: String,
        /// Task kind.
        #[arg(long = "type", value_name = "KIND", allow_hyphen_values = true)]
        kind: i64,
        /// Payload text, or the path of a file holding it.
        #[arg(long)]
        data: String,
        /// Free-text description.
        #[arg(long)]
        desc: Option<String>,
    },
    /// Start a not-started task.
    Start {
        /// Task identifier.
        id: u64,
        /// Worker recorded as the task owner.
        #[arg(long)]
        worker: Option<String>,
    },
    /// Report progress.
    Update {
        /// Task identifier.
        id: u64,
        /// Percentage done, `0..=100`.
        #[arg(long, allow_hyphen_values = true)]
        progress: i64,
        /// Status to force (code or name).
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
    },
    /// Complete a task at 100%.
    Complete {
        /// Task identifier.
        id: u64,
    },
    /// Mark a task as failed.
    #[command(name = "error")]
    Fail {
        /// Task identifier.
        id: u64,
    },
    /// Claim the next task for a worker.
    Next {
        /// Claiming worker.
        #[arg(long)]
        worker: String,
    },
    /// Clear the worker of an in-progress task so another worker can claim
    /// it.
    Release {
        /// Task identifier.
        id: u64,
    },
    /// Include a task in claim selection.
    Enable {
        /// Task identifier.
        id: u64,
    },
    /// Exclude a task from claim selection.
    Disable {
        /// Task identifier.
        id: u64,
    },
    /// Delete a task and its status.
    Delete {
        /// Task identifier.
        id: u64,
    },
}

fn parse_status(text: &str) -> Result<TaskStatus, ParseTaskStatusError> {
    TaskStatus::try_from(text)
}
