//! Execution, job and task status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Execution has been created but not started.
    #[default]
    Pending,
    /// The runnable is being awaited.
    Running,
    /// The runnable reported success.
    Success,
    /// The pipeline was missing, raised, or reported failed/partial.
    Failed,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl PipelineStatus {
    /// Returns true if the status is final.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// Status of a job.
///
/// `pending -> running -> {success, failed, partial, cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, not yet started.
    #[default]
    Pending,
    /// Tasks are executing.
    Running,
    /// Every executed task succeeded.
    Success,
    /// At least one task failed.
    Failed,
    /// Some work succeeded and some did not.
    Partial,
    /// Cancellation was requested.
    Cancelled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Partial => write!(f, "partial"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl JobStatus {
    /// Returns true if the status is final.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Partial | Self::Cancelled
        )
    }
}

/// Status of a task (one pipeline execution inside a job).
///
/// `pending -> running -> {success, failed, cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet started.
    #[default]
    Pending,
    /// The pipeline is running.
    Running,
    /// The pipeline succeeded.
    Success,
    /// The pipeline failed.
    Failed,
    /// The task was cancelled.
    Cancelled,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl TaskStatus {
    /// Returns true if the status is final.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled)
    }
}

impl From<PipelineStatus> for TaskStatus {
    fn from(status: PipelineStatus) -> Self {
        match status {
            PipelineStatus::Pending => Self::Pending,
            PipelineStatus::Running => Self::Running,
            PipelineStatus::Success => Self::Success,
            PipelineStatus::Failed => Self::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_status_display() {
        assert_eq!(PipelineStatus::Pending.to_string(), "pending");
        assert_eq!(PipelineStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineStatus::Success.is_terminal());
        assert!(!PipelineStatus::Running.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Partial.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_job_status_serialize() {
        let json = serde_json::to_string(&JobStatus::Cancelled).unwrap();
        assert_eq!(json, r#""cancelled""#);

        let status: JobStatus = serde_json::from_str(r#""running""#).unwrap();
        assert_eq!(status, JobStatus::Running);
    }

    #[test]
    fn test_task_status_from_pipeline_status() {
        assert_eq!(TaskStatus::from(PipelineStatus::Failed), TaskStatus::Failed);
        assert_eq!(TaskStatus::from(PipelineStatus::Success), TaskStatus::Success);
    }
}
