//! Tagged result returned by a pipeline run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A per-file failure recorded by a partially successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    /// The file that failed.
    pub file: String,
    /// Error text.
    pub error: String,
}

impl FileError {
    /// Creates a new file error.
    #[must_use]
    pub fn new(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            error: error.into(),
        }
    }
}

/// The outcome of [`Runnable::run`](crate::pipeline::Runnable::run).
///
/// Serialized with a `status` tag so stored task stats keep the familiar
/// `{"status": "success", "rows_processed": ...}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Everything the run attempted succeeded.
    Success {
        /// Input files processed.
        #[serde(default)]
        files_processed: u64,
        /// Rows written.
        #[serde(default)]
        rows_processed: u64,
        /// Human-readable summary.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Pipeline-specific statistics.
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        extra: Map<String, Value>,
    },
    /// Some inputs failed; the rest were processed.
    Partial {
        /// Input files processed successfully.
        #[serde(default)]
        files_processed: u64,
        /// Rows written.
        #[serde(default)]
        rows_processed: u64,
        /// Human-readable summary.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// The per-file failures.
        #[serde(default)]
        errors: Vec<FileError>,
    },
    /// The run failed.
    Failed {
        /// Error text.
        error: String,
        /// Human-readable summary.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl RunOutcome {
    /// Creates a success outcome.
    #[must_use]
    pub fn success(files_processed: u64, rows_processed: u64) -> Self {
        Self::Success {
            files_processed,
            rows_processed,
            message: None,
            extra: Map::new(),
        }
    }

    /// Creates a success outcome with no counters.
    #[must_use]
    pub fn ok_empty() -> Self {
        Self::success(0, 0)
    }

    /// Creates a partial outcome.
    #[must_use]
    pub fn partial(files_processed: u64, rows_processed: u64, errors: Vec<FileError>) -> Self {
        Self::Partial {
            files_processed,
            rows_processed,
            message: None,
            errors,
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
            message: None,
        }
    }

    /// Sets the message on any variant.
    #[must_use]
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Self::Success { message, .. }
            | Self::Partial { message, .. }
            | Self::Failed { message, .. } => *message = Some(text.into()),
        }
        self
    }

    /// Adds a pipeline-specific statistic to a success outcome.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_stat(mut self, key: impl Into<String>, value: Value) -> Self {
        if let Self::Success { extra, .. } = &mut self {
            extra.insert(key.into(), value);
        }
        self
    }

    /// Returns the `status` tag.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Partial { .. } => "partial",
            Self::Failed { .. } => "failed",
        }
    }

    /// Returns true only for the success variant.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { message, .. }
            | Self::Partial { message, .. }
            | Self::Failed { message, .. } => message.as_deref(),
        }
    }

    /// Returns the error text of a failed outcome.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Files processed (0 for failed runs).
    #[must_use]
    pub fn files_processed(&self) -> u64 {
        match self {
            Self::Success { files_processed, .. } | Self::Partial { files_processed, .. } => {
                *files_processed
            }
            Self::Failed { .. } => 0,
        }
    }

    /// Rows processed (0 for failed runs).
    #[must_use]
    pub fn rows_processed(&self) -> u64 {
        match self {
            Self::Success { rows_processed, .. } | Self::Partial { rows_processed, .. } => {
                *rows_processed
            }
            Self::Failed { .. } => 0,
        }
    }

    /// Renders the outcome as the JSON stats payload stored on tasks.
    #[must_use]
    pub fn to_stats(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
