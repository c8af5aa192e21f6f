//! Per-execution state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{PipelineLayer, PipelineRef, PipelineStatus, RunOutcome, TaskStatus};
use crate::jobs::Task;
use crate::utils::{duration_seconds, Timestamp};

/// State of one pipeline execution, kept in the executor's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// Identifier of this run; also the task id when run inside a job.
    pub run_id: String,
    /// Pipeline name within its layer.
    pub pipeline_name: String,
    /// Pipeline layer.
    pub layer: PipelineLayer,
    /// Current status.
    pub status: PipelineStatus,
    /// Unset when the pipeline was never started (e.g. not registered).
    pub started_at: Option<Timestamp>,
    /// Set once `run` returned or panicked.
    pub completed_at: Option<Timestamp>,
    /// What the runnable reported, if it returned normally.
    pub outcome: Option<RunOutcome>,
    /// Failure text for missing, raising or panicking pipelines.
    pub error: Option<String>,
}

impl ExecutionState {
    /// Creates a pending state.
    #[must_use]
    pub fn new(run_id: impl Into<String>, pipeline_name: impl Into<String>, layer: PipelineLayer) -> Self {
        Self {
            run_id: run_id.into(),
            pipeline_name: pipeline_name.into(),
            layer,
            status: PipelineStatus::Pending,
            started_at: None,
            completed_at: None,
            outcome: None,
            error: None,
        }
    }

    /// Returns the `(layer, name)` reference.
    #[must_use]
    pub fn pipeline_ref(&self) -> PipelineRef {
        PipelineRef::new(self.layer, self.pipeline_name.clone())
    }

    /// Seconds between start and completion, when both are set.
    #[must_use]
    pub fn duration_seconds(&self) -> Option<f64> {
        Some(duration_seconds(self.started_at?, self.completed_at?))
    }

    /// The outcome's message, empty when there is none.
    #[must_use]
    pub fn message(&self) -> &str {
        self.outcome
            .as_ref()
            .and_then(RunOutcome::message)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Success
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == PipelineStatus::Failed
    }

    /// Renders the flat view served to callers.
    #[must_use]
    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            run_id: self.run_id.clone(),
            pipeline_name: self.pipeline_name.clone(),
            layer: self.layer,
            status: self.status,
            started_at: self.started_at,
            completed_at: self.completed_at,
            duration_seconds: self.duration_seconds(),
            message: self.message().to_string(),
            error: self.error.clone(),
            stats: self.outcome.as_ref().map(RunOutcome::to_stats),
        }
    }

    /// Builds the task record mirroring this state.
    ///
    /// The task's error is only set for raised errors and `failed` outcomes;
    /// a `partial` outcome fails the task but keeps its message only.
    pub(crate) fn to_task(&self, task_started_at: Option<Timestamp>) -> Task {
        let mut task = Task::new(self.run_id.clone(), self.pipeline_name.clone(), self.layer);
        task.status = TaskStatus::from(self.status);
        task.started_at = task_started_at;
        task.completed_at = self.completed_at;
        task.duration_seconds = self.duration_seconds();
        task.message = self.message().to_string();
        task.error = self
            .error
            .clone()
            .or_else(|| self.outcome.as_ref().and_then(RunOutcome::error).map(str::to_string));
        task.stats = self.outcome.as_ref().map(RunOutcome::to_stats);
        task
    }
}

/// Serializable execution view with derived fields.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub run_id: String,
    pub pipeline_name: String,
    pub layer: PipelineLayer,
    pub status: PipelineStatus,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub duration_seconds: Option<f64>,
    pub message: String,
    pub error: Option<String>,
    pub stats: Option<Value>,
}
