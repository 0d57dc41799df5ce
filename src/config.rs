//! Layered configuration for the `taskctl` binary.
//!
//! Values resolve in increasing precedence: built-in defaults, a TOML file,
//! `TASKCTL_*` environment variables, and finally command-line flags (applied
//! by the binary itself).
//!
//! ```toml
//! [store]
//! backend = "file"
//! data_dir = "/var/lib/taskctl"
//! task_collection = "task"
//! status_collection = "status"
//!
//! [lifecycle]
//! max_conflict_retries = 8
//! ```

use crate::task::services::LifecycleConfig;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::str::FromStr;
use thiserror::Error;

/// File consulted when no explicit configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "taskctl.toml";

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "TASKCTL_";

/// Errors raised while assembling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that failed to load.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML for [`Config`].
    #[error("invalid config file: {0}")]
    Parse(#[source] Box<toml::de::Error>),

    /// A backend name was not recognised.
    #[error("unknown backend '{0}'; expected memory, file, or postgres")]
    UnknownBackend(String),

    /// An environment override could not be parsed.
    #[error("invalid value '{value}' for {key}")]
    InvalidValue {
        /// Offending variable.
        key: String,
        /// Rejected value.
        value: String,
    },

    /// The `PostgreSQL` backend was selected without a connection URL.
    #[error("the postgres backend requires a database URL")]
    MissingDatabaseUrl,
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(Box::new(err))
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Process-local store; contents vanish on exit.
    Memory,
    /// One JSON document per record below a data directory.
    #[default]
    File,
    /// `PostgreSQL` tables through Diesel.
    Postgres,
}

impl Backend {
    /// Returns the canonical textual representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Postgres => "postgres",
        }
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(ConfigError::UnknownBackend(value.to_owned())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how records are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Selected backend.
    pub backend: Backend,
    /// Root directory for the file backend.
    pub data_dir: Utf8PathBuf,
    /// Connection URL for the `PostgreSQL` backend.
    pub database_url: Option<String>,
    /// Collection holding tasks in the file backend.
    pub task_collection: String,
    /// Collection holding statuses in the file backend.
    pub status_collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: Utf8PathBuf::from("taskctl-data"),
            database_url: None,
            task_collection: "task".to_owned(),
            status_collection: "status".to_owned(),
        }
    }
}

impl StoreConfig {
    /// Returns the `PostgreSQL` connection URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDatabaseUrl`] when none is configured.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

/// Complete `taskctl` configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Storage settings.
    pub store: StoreConfig,
    /// Concurrency tuning for the lifecycle engine.
    pub lifecycle: LifecycleConfig,
}

impl Config {
    /// Parses configuration from TOML text; missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents or unknown
    /// keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when
    /// present.
    ///
    /// An explicit path must exist; the default file is optional.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let (target, required) = path.map_or_else(
            || (Utf8Path::new(DEFAULT_CONFIG_FILE), false),
            |explicit| (explicit, true),
        );
        match read_file(target) {
            Ok(text) => Self::from_toml_str(&text),
            Err(source) if !required && source.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: target.to_owned(),
                source,
            }),
        }
    }

    /// Applies `TASKCTL_*` overrides from `vars`.
    ///
    /// Recognised keys are `TASKCTL_BACKEND`, `TASKCTL_DATA_DIR`,
    /// `TASKCTL_DATABASE_URL`, `TASKCTL_TASK_COLLECTION`,
    /// `TASKCTL_STATUS_COLLECTION`, and `TASKCTL_MAX_CONFLICT_RETRIES`.
    /// Other variables are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownBackend`] or
    /// [`ConfigError::InvalidValue`] for unparsable values.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let text: String = value.into();
            match name {
                "BACKEND" => self.store.backend = text.parse()?,
                "DATA_DIR" => self.store.data_dir = Utf8PathBuf::from(text),
                "DATABASE_URL" => self.store.database_url = Some(text),
                "TASK_COLLECTION" => self.store.task_collection = text,
                "STATUS_COLLECTION" => self.store.status_collection = text,
                "MAX_CONFLICT_RETRIES" => {
                    self.lifecycle.max_conflict_retries =
                        text.trim().parse().map_err(|_| ConfigError::InvalidValue {
                            key: key.as_ref().to_owned(),
                            value: text.clone(),
                        })?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn read_file(path: &Utf8Path) -> io::Result<String> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    Dir::open_ambient_dir(parent, ambient_authority())?.read_to_string(file_name)
}
