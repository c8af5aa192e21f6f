//! Job and task records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{JobStatus, PipelineLayer, TaskStatus};
use crate::utils::Timestamp;

/// A tracked group of pipeline executions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// UUID v4 identifier.
    pub job_id: String,
    /// Display name, e.g. `silver.geo` or `Full Pipeline - Bronze Only`.
    pub job_name: String,
    /// Current status.
    pub status: JobStatus,
    /// Creation time.
    pub started_at: Timestamp,
    /// Set once the job reaches a terminal status.
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    /// Number of tasks the job expects to run.
    #[serde(default)]
    pub total_tasks: usize,
    /// Tasks that reached a terminal status.
    #[serde(default)]
    pub completed_tasks: usize,
    /// Tasks that failed.
    #[serde(default)]
    pub failed_tasks: usize,
    /// `completed_tasks / total_tasks * 100`, 0 when there are no tasks.
    #[serde(default)]
    pub progress_percent: f64,
    /// Who triggered the job.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// One pipeline execution inside a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Equal to the execution's run id.
    pub task_id: String,
    /// Pipeline name within its layer.
    pub pipeline_name: String,
    /// Pipeline layer.
    pub layer: PipelineLayer,
    /// Current status.
    pub status: TaskStatus,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Summary message, empty until the run reports one.
    #[serde(default)]
    pub message: String,
    /// Error text for raised or failed runs.
    #[serde(default)]
    pub error: Option<String>,
    /// The serialized run outcome.
    #[serde(default)]
    pub stats: Option<Value>,
}

impl Task {
    /// Creates a pending task with no timestamps.
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        pipeline_name: impl Into<String>,
        layer: PipelineLayer,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            pipeline_name: pipeline_name.into(),
            layer,
            status: TaskStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_seconds: None,
            message: String::new(),
            error: None,
            stats: None,
        }
    }
}

/// Partial update applied by
/// [`JobTracker::update_job_progress`](super::JobTracker::update_job_progress).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobProgressUpdate {
    /// New status.
    pub status: Option<JobStatus>,
    /// New expected task count; also used for this call's progress.
    pub total_tasks: Option<usize>,
    /// New completed count; triggers a progress recomputation.
    pub completed_tasks: Option<usize>,
    /// New failed count.
    pub failed_tasks: Option<usize>,
    /// Completion time.
    pub completed_at: Option<Timestamp>,
}

impl JobProgressUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn total_tasks(mut self, total: usize) -> Self {
        self.total_tasks = Some(total);
        self
    }

    #[must_use]
    pub fn completed_tasks(mut self, completed: usize) -> Self {
        self.completed_tasks = Some(completed);
        self
    }

    #[must_use]
    pub fn failed_tasks(mut self, failed: usize) -> Self {
        self.failed_tasks = Some(failed);
        self
    }

    #[must_use]
    pub fn completed_at(mut self, at: Timestamp) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// Returns true if the update would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Renders the update as document fields.
    ///
    /// Progress is recomputed whenever `completed_tasks` is present, against
    /// this update's total if given, else `stored_total`.
    pub(crate) fn to_fields(&self, stored_total: usize) -> Result<Map<String, Value>, serde_json::Error> {
        let mut fields = Map::new();
        if let Some(status) = self.status {
            fields.insert("status".into(), serde_json::to_value(status)?);
        }
        if let Some(total) = self.total_tasks {
            fields.insert("total_tasks".into(), total.into());
        }
        if let Some(completed) = self.completed_tasks {
            fields.insert("completed_tasks".into(), completed.into());
            let total = self.total_tasks.unwrap_or(stored_total);
            fields.insert(
                "progress_percent".into(),
                progress_percent(completed, total).into(),
            );
        }
        if let Some(failed) = self.failed_tasks {
            fields.insert("failed_tasks".into(), failed.into());
        }
        if let Some(at) = self.completed_at {
            fields.insert("completed_at".into(), serde_json::to_value(at)?);
        }
        Ok(fields)
    }
}

/// `completed / total * 100`, or 0 when `total` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

/// A job as returned by lookups, optionally with its tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    /// The job record.
    #[serde(flatten)]
    pub job: Job,
    /// Tasks ordered by start time, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::now_utc;
    use serde_json::json;

    #[test]
    fn test_progress_percent() {
        assert!((progress_percent(3, 6) - 50.0).abs() < f64::EPSILON);
        assert!(progress_percent(3, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_fields_use_call_total_first() {
        let fields = JobProgressUpdate::new()
            .total_tasks(4)
            .completed_tasks(1)
            .to_fields(10)
            .unwrap();
        assert_eq!(fields["progress_percent"], json!(25.0));
        assert_eq!(fields["total_tasks"], json!(4));
    }

    #[test]
    fn test_update_without_completed_leaves_progress() {
        let fields = JobProgressUpdate::new()
            .status(JobStatus::Running)
            .to_fields(10)
            .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["status"], json!("running"));
    }

    #[test]
    fn test_job_view_flattens() {
        let view = JobView {
            job: Job {
                job_id: "j".into(),
                job_name: "bronze.geo".into(),
                status: JobStatus::Success,
                started_at: now_utc(),
                completed_at: None,
                total_tasks: 1,
                completed_tasks: 1,
                failed_tasks: 0,
                progress_percent: 100.0,
                user_id: None,
            },
            tasks: Some(vec![Task::new("t", "geo", PipelineLayer::Bronze)]),
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["job_id"], json!("j"));
        assert_eq!(value["tasks"][0]["layer"], json!("bronze"));
        assert_eq!(value["tasks"][0]["status"], json!("pending"));
    }
}
