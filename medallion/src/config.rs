//! Engine configuration.
//!
//! Loaded from JSON, with `MEDALLION_*` environment variables taking
//! precedence over file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::checkpoint::CHECKPOINT_COLLECTION;
use crate::errors::{MedallionError, Result};
use crate::jobs::JOBS_COLLECTION;
use crate::pipeline::DEFAULT_HISTORY_CAPACITY;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `info,medallion=debug`.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

/// Configuration for an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executions kept in the in-memory history.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Jobs returned by `list_jobs` when the caller gives no limit.
    #[serde(default = "default_list_limit")]
    pub default_list_limit: usize,
    /// Collection holding job documents.
    #[serde(default = "default_jobs_collection")]
    pub jobs_collection: String,
    /// Collection holding checkpoint documents.
    #[serde(default = "default_checkpoints_collection")]
    pub checkpoints_collection: String,
    /// Directory of the file-backed store; in-memory when unset.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_list_limit() -> usize {
    50
}

fn default_jobs_collection() -> String {
    JOBS_COLLECTION.to_string()
}

fn default_checkpoints_collection() -> String {
    CHECKPOINT_COLLECTION.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            default_list_limit: default_list_limit(),
            jobs_collection: default_jobs_collection(),
            checkpoints_collection: default_checkpoints_collection(),
            store_dir: None,
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the history capacity.
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Sets the default `list_jobs` limit.
    #[must_use]
    pub fn with_default_list_limit(mut self, limit: usize) -> Self {
        self.default_list_limit = limit;
        self
    }

    /// Persists documents as JSON files under `dir`.
    #[must_use]
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(dir.into());
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Parses a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| MedallionError::Config(format!("invalid engine config: {e}")))
    }

    /// Reads a JSON configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            MedallionError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Applies `MEDALLION_*` overrides from the process environment.
    ///
    /// Recognized: `MEDALLION_HISTORY_CAPACITY`, `MEDALLION_LIST_LIMIT`,
    /// `MEDALLION_STORE_DIR`, `MEDALLION_LOG` and `MEDALLION_LOG_JSON`.
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup("MEDALLION_HISTORY_CAPACITY") {
            self.history_capacity = parse_var("MEDALLION_HISTORY_CAPACITY", &value)?;
        }
        if let Some(value) = lookup("MEDALLION_LIST_LIMIT") {
            self.default_list_limit = parse_var("MEDALLION_LIST_LIMIT", &value)?;
        }
        if let Some(value) = lookup("MEDALLION_STORE_DIR") {
            self.store_dir = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        if let Some(value) = lookup("MEDALLION_LOG") {
            self.log.filter = value;
        }
        if let Some(value) = lookup("MEDALLION_LOG_JSON") {
            self.log.json = matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(self)
    }
}

fn parse_var(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| MedallionError::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}
