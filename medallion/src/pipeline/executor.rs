//! The pipeline executor.
//!
//! Runs single pipelines, dependency chains and full bronze/silver runs,
//! mirroring every step into the job tracker and the execution history.

use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{resolve, ExecutionHistory, ExecutionState, PipelineRegistry};
use crate::cancellation::JobCancellations;
use crate::core::{JobStatus, PipelineLayer, PipelineRef, PipelineStatus, RunOutcome};
use crate::errors::{ExecutionError, MedallionError, Result};
use crate::events::{names, EventSink, NoOpEventSink};
use crate::jobs::{Job, JobProgressUpdate, JobTracker, Task};
use crate::utils::{generate_id, now_utc};

/// Job name for a full run with the given layer flags.
#[must_use]
pub fn full_pipeline_job_name(bronze_only: bool, silver_only: bool) -> &'static str {
    if bronze_only {
        "Full Pipeline - Bronze Only"
    } else if silver_only {
        "Full Pipeline - Silver Only"
    } else {
        "Full Pipeline - Bronze → Silver"
    }
}

#[derive(Debug, Default)]
struct StepRun {
    states: Vec<ExecutionState>,
    completed: usize,
    failed: usize,
    cancelled: bool,
}

/// Orchestrates pipeline execution.
///
/// Pipelines run strictly one after another. Failures of a pipeline are
/// captured in its [`ExecutionState`]; only resolution and persistence
/// errors are returned to the caller.
pub struct PipelineExecutor {
    registry: Arc<PipelineRegistry>,
    tracker: JobTracker,
    history: ExecutionHistory,
    events: Arc<dyn EventSink>,
    cancellations: JobCancellations,
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("registry", &self.registry)
            .field("tracker", &self.tracker)
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    /// Creates an executor with the default history capacity and no event sink.
    #[must_use]
    pub fn new(registry: Arc<PipelineRegistry>, tracker: JobTracker) -> Self {
        Self {
            registry,
            tracker,
            history: ExecutionHistory::default(),
            events: Arc::new(NoOpEventSink),
            cancellations: JobCancellations::new(),
        }
    }

    /// Sets how many executions the history retains.
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = ExecutionHistory::new(capacity);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PipelineRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Executes one pipeline.
    ///
    /// With `job_id`, a task with id `run_id` is added to the job and kept in
    /// step with the execution state. A missing pipeline, an `Err` from
    /// `run`, a panic, or a `failed`/`partial` outcome all produce a `failed`
    /// state rather than an error.
    ///
    /// # Errors
    ///
    /// Only persistence failures while recording the task.
    pub async fn execute_pipeline(
        &self,
        layer: PipelineLayer,
        name: &str,
        force: bool,
        run_id: Option<&str>,
        job_id: Option<&str>,
    ) -> Result<ExecutionState> {
        let run_id = run_id.map_or_else(generate_id, str::to_string);
        let full_name = format!("{layer}.{name}");
        let mut state = ExecutionState::new(run_id.clone(), name, layer);

        info!(pipeline = %full_name, %run_id, force, "Executing pipeline");

        let task_started_at = now_utc();
        if let Some(job_id) = job_id {
            let mut task = Task::new(run_id.clone(), name, layer);
            task.started_at = Some(task_started_at);
            self.tracker.add_task(job_id, &task).await?;
        }
        self.history.record(&state);

        let Some(runnable) = self.registry.get(layer, name) else {
            state.status = PipelineStatus::Failed;
            state.error = Some(ExecutionError::NotFound(full_name.clone()).to_string());
            self.history.record(&state);
            error!(pipeline = %full_name, %run_id, "Pipeline not found");

            if let Some(job_id) = job_id {
                let mut task = state.to_task(Some(task_started_at));
                task.completed_at = Some(now_utc());
                self.tracker.update_task(job_id, &task).await?;
            }
            self.emit_finished(&state, job_id).await;
            return Ok(state);
        };

        state.status = PipelineStatus::Running;
        state.started_at = Some(now_utc());
        self.history.record(&state);
        if let Some(job_id) = job_id {
            self.tracker
                .update_task(job_id, &state.to_task(Some(task_started_at)))
                .await?;
        }
        self.events
            .emit(
                names::PIPELINE_STARTED,
                json!({"run_id": run_id, "pipeline": full_name, "job_id": job_id}),
            )
            .await;

        let result = AssertUnwindSafe(runnable.run(force)).catch_unwind().await;
        state.completed_at = Some(now_utc());
        match result {
            Ok(Ok(outcome)) => {
                state.status = if outcome.is_success() {
                    PipelineStatus::Success
                } else {
                    PipelineStatus::Failed
                };
                info!(
                    pipeline = %full_name,
                    %run_id,
                    outcome = outcome.status(),
                    "Pipeline completed"
                );
                state.outcome = Some(outcome);
            }
            Ok(Err(e)) => {
                state.status = PipelineStatus::Failed;
                state.error = Some(ExecutionError::Raised(format!("{e:#}")).to_string());
                error!(pipeline = %full_name, %run_id, error = %e, "Pipeline failed");
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                state.status = PipelineStatus::Failed;
                state.error = Some(ExecutionError::Panicked(message).to_string());
                error!(pipeline = %full_name, %run_id, error = ?state.error, "Pipeline panicked");
            }
        }
        self.history.record(&state);

        if let Some(job_id) = job_id {
            self.tracker
                .update_task(job_id, &state.to_task(Some(task_started_at)))
                .await?;
        }
        self.emit_finished(&state, job_id).await;
        Ok(state)
    }

    /// Executes a pipeline after its transitive dependencies.
    ///
    /// Resolution happens first, so a cycle fails before anything runs.
    /// Stops at the first failed pipeline, returning the states so far, and
    /// before the next step once `job_id` has been cancelled. A `job_id` not
    /// already running here is active, and so cancellable, for this call.
    /// Tasks are added to the job but its counters and status are left alone.
    pub async fn execute_with_dependencies(
        &self,
        layer: PipelineLayer,
        name: &str,
        force: bool,
        job_id: Option<&str>,
    ) -> Result<Vec<ExecutionState>> {
        let target = PipelineRef::new(layer, name);
        info!(pipeline = %target, "Resolving dependencies");
        let order = resolve(&self.registry, &target).map_err(|e| {
            error!(pipeline = %target, error = %e, "Dependency resolution failed");
            e
        })?;

        let owned = job_id.filter(|id| !self.cancellations.is_active(id));
        if let Some(id) = owned {
            self.cancellations.activate(id);
        }

        let mut run = StepRun::default();
        let result = self.run_steps(&order, force, job_id, false, &mut run).await;
        if let Some(id) = owned {
            self.cancellations.finish(id);
        }
        result.map(|()| run.states)
    }

    /// Runs a pipeline and its dependencies inside a dedicated job.
    ///
    /// The job is named `layer.name` and expects one task per resolved step.
    pub async fn run_with_dependencies_job(
        &self,
        layer: PipelineLayer,
        name: &str,
        force: bool,
        user_id: Option<&str>,
    ) -> Result<(String, Vec<ExecutionState>)> {
        let target = PipelineRef::new(layer, name);
        let order = resolve(&self.registry, &target)?;
        info!(
            pipeline = %target,
            order = ?order.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Execution order"
        );

        let job = self.start_job(&target.full_name(), order.len(), user_id).await?;
        let mut run = StepRun::default();
        match self.run_steps(&order, force, Some(&job.job_id), true, &mut run).await {
            Ok(()) => {
                self.finish_job(&job.job_id, &run).await?;
                Ok((job.job_id, run.states))
            }
            Err(e) => {
                self.abort_job(&job.job_id, &e).await;
                Err(e)
            }
        }
    }

    /// Runs every registered bronze pipeline, then every silver pipeline.
    ///
    /// Each layer runs in registration order and stops at its first failure;
    /// silver only runs when bronze had no failures. Dependencies are not
    /// re-resolved: bronze has already run when silver starts.
    pub async fn execute_full_pipeline(
        &self,
        bronze_only: bool,
        silver_only: bool,
        force: bool,
        user_id: Option<&str>,
    ) -> Result<(String, Vec<ExecutionState>)> {
        let layer_steps = |layer: PipelineLayer| -> Vec<PipelineRef> {
            self.registry
                .names(layer)
                .into_iter()
                .map(|name| PipelineRef::new(layer, name))
                .collect()
        };
        let bronze = if silver_only { Vec::new() } else { layer_steps(PipelineLayer::Bronze) };
        let silver = if bronze_only { Vec::new() } else { layer_steps(PipelineLayer::Silver) };

        let job_name = full_pipeline_job_name(bronze_only, silver_only);
        let job = self.start_job(job_name, bronze.len() + silver.len(), user_id).await?;

        let mut run = StepRun::default();
        let result = async {
            if !silver_only {
                info!("Running all bronze pipelines");
                self.run_steps(&bronze, force, Some(&job.job_id), true, &mut run).await?;
            }
            if !bronze_only && run.failed == 0 && !run.cancelled {
                info!("Running all silver pipelines");
                self.run_steps(&silver, force, Some(&job.job_id), true, &mut run).await?;
            }
            Ok::<_, MedallionError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.finish_job(&job.job_id, &run).await?;
                Ok((job.job_id, run.states))
            }
            Err(e) => {
                self.abort_job(&job.job_id, &e).await;
                Err(e)
            }
        }
    }

    /// Requests cancellation of a job running in this executor.
    ///
    /// The job is marked `cancelled` immediately; the running pipeline, if
    /// any, finishes and no further step starts. Returns false when the job
    /// is not active here.
    pub async fn cancel_job(&self, job_id: &str) -> Result<bool> {
        if !self.cancellations.cancel(job_id) {
            warn!(job_id, "Cancellation requested for inactive job");
            return Ok(false);
        }

        self.tracker
            .update_job_progress(
                job_id,
                JobProgressUpdate::new()
                    .status(JobStatus::Cancelled)
                    .completed_at(now_utc()),
            )
            .await?;
        info!(job_id, "Job cancelled");
        self.events
            .emit(names::JOB_CANCELLED, json!({"job_id": job_id}))
            .await;
        Ok(true)
    }

    /// Returns true if `job_id` is running in this executor.
    #[must_use]
    pub fn is_job_active(&self, job_id: &str) -> bool {
        self.cancellations.is_active(job_id)
    }

    /// Looks up an execution in the history.
    #[must_use]
    pub fn get_execution_state(&self, run_id: &str) -> Option<ExecutionState> {
        self.history.get(run_id)
    }

    /// Returns up to `limit` executions, most recently started first.
    #[must_use]
    pub fn get_execution_history(&self, limit: usize) -> Vec<ExecutionState> {
        self.history.recent(limit)
    }

    async fn run_steps(
        &self,
        steps: &[PipelineRef],
        force: bool,
        job_id: Option<&str>,
        track_progress: bool,
        run: &mut StepRun,
    ) -> Result<()> {
        for step in steps {
            if let Some(job_id) = job_id {
                if self.cancellations.is_cancelled(job_id) {
                    warn!(job_id, next = %step, "Job cancelled, skipping remaining pipelines");
                    run.cancelled = true;
                    return Ok(());
                }
            }

            let state = self
                .execute_pipeline(step.layer, &step.name, force, None, job_id)
                .await?;
            let failed = state.is_failed();
            if state.is_success() {
                run.completed += 1;
            } else if failed {
                run.failed += 1;
            }
            run.states.push(state);

            if let (true, Some(job_id)) = (track_progress, job_id) {
                self.tracker
                    .update_job_progress(
                        job_id,
                        JobProgressUpdate::new()
                            .completed_tasks(run.completed)
                            .failed_tasks(run.failed),
                    )
                    .await?;
            }

            if failed {
                error!(pipeline = %step, "Pipeline failed, stopping remaining pipelines");
                return Ok(());
            }
        }
        Ok(())
    }

    async fn start_job(&self, name: &str, total: usize, user_id: Option<&str>) -> Result<Job> {
        let job = self.tracker.create_job(name, total, user_id).await?;
        self.cancellations.activate(&job.job_id);

        if let Err(e) = self
            .tracker
            .update_job_progress(&job.job_id, JobProgressUpdate::new().status(JobStatus::Running))
            .await
        {
            let e = MedallionError::from(e);
            self.abort_job(&job.job_id, &e).await;
            return Err(e);
        }

        self.events
            .emit(
                names::JOB_STARTED,
                json!({"job_id": job.job_id, "job_name": name, "total_tasks": total}),
            )
            .await;
        Ok(job)
    }

    async fn finish_job(&self, job_id: &str, run: &StepRun) -> Result<JobStatus> {
        let cancelled = self.cancellations.finish(job_id) || run.cancelled;

        let status = if cancelled {
            JobStatus::Cancelled
        } else if run.failed > 0 {
            JobStatus::Failed
        } else {
            JobStatus::Success
        };

        // cancel_job already stamped the cancelled status and completion time.
        let update = JobProgressUpdate::new()
            .completed_tasks(run.completed)
            .failed_tasks(run.failed);
        let update = if cancelled {
            update
        } else {
            update.status(status).completed_at(now_utc())
        };
        self.tracker.update_job_progress(job_id, update).await?;

        info!(
            job_id,
            %status,
            completed = run.completed,
            failed = run.failed,
            "Job finished"
        );
        self.events
            .emit(
                names::JOB_COMPLETED,
                json!({
                    "job_id": job_id,
                    "status": status,
                    "completed_tasks": run.completed,
                    "failed_tasks": run.failed,
                }),
            )
            .await;
        Ok(status)
    }

    async fn abort_job(&self, job_id: &str, cause: &MedallionError) {
        error!(job_id, error = %cause, "Job execution failed");
        self.cancellations.finish(job_id);
        let update = JobProgressUpdate::new()
            .status(JobStatus::Failed)
            .completed_at(now_utc());
        if let Err(e) = self.tracker.update_job_progress(job_id, update).await {
            error!(job_id, error = %e, "Could not mark job failed");
        }
    }

    async fn emit_finished(&self, state: &ExecutionState, job_id: Option<&str>) {
        let pipeline = state.pipeline_ref().to_string();
        if state.is_success() {
            self.events
                .emit(
                    names::PIPELINE_COMPLETED,
                    json!({
                        "run_id": state.run_id,
                        "pipeline": pipeline,
                        "job_id": job_id,
                        "duration_seconds": state.duration_seconds(),
                        "stats": state.outcome.as_ref().map(RunOutcome::to_stats),
                    }),
                )
                .await;
        } else {
            let error = state
                .error
                .clone()
                .or_else(|| state.outcome.as_ref().and_then(|o| o.error().map(str::to_string)))
                .unwrap_or_else(|| state.message().to_string());
            self.events
                .emit(
                    names::PIPELINE_FAILED,
                    json!({
                        "run_id": state.run_id,
                        "pipeline": pipeline,
                        "job_id": job_id,
                        "error": error,
                    }),
                )
                .await;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
