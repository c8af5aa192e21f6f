//! Persistent job/task tracking.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::model::{Job, JobProgressUpdate, JobView, Task};
use crate::core::JobStatus;
use crate::errors::PersistenceError;
use crate::storage::{DocumentStore, Query, SortDirection};
use crate::utils::{generate_id, now_utc};

/// Default collection jobs are stored in.
pub const JOBS_COLLECTION: &str = "jobs";

/// Persists jobs and their tasks and keeps job progress current.
///
/// Tasks of job `J` live in the `{jobs}/{J}/tasks` collection.
#[derive(Clone)]
pub struct JobTracker {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl fmt::Debug for JobTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobTracker")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl JobTracker {
    /// Creates a tracker over the default `jobs` collection.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_collection(store, JOBS_COLLECTION)
    }

    /// Creates a tracker over a custom collection.
    #[must_use]
    pub fn with_collection(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    fn tasks_collection(&self, job_id: &str) -> String {
        format!("{}/{job_id}/tasks", self.collection)
    }

    /// Creates and persists a pending job.
    pub async fn create_job(
        &self,
        job_name: &str,
        total_tasks: usize,
        user_id: Option<&str>,
    ) -> Result<Job, PersistenceError> {
        let job = Job {
            job_id: generate_id(),
            job_name: job_name.to_string(),
            status: JobStatus::Pending,
            started_at: now_utc(),
            completed_at: None,
            total_tasks,
            completed_tasks: 0,
            failed_tasks: 0,
            progress_percent: 0.0,
            user_id: user_id.map(str::to_string),
        };
        self.store
            .set(&self.collection, &job.job_id, serde_json::to_value(&job)?)
            .await?;

        info!(job_id = %job.job_id, job_name, user_id = ?user_id, total_tasks, "Created job");
        Ok(job)
    }

    /// Replaces a stored job wholesale.
    pub async fn update_job(&self, job: &Job) -> Result<(), PersistenceError> {
        let serde_json::Value::Object(fields) = serde_json::to_value(job)? else {
            return Err(PersistenceError::backend("job did not serialize to an object"));
        };
        self.store.update(&self.collection, &job.job_id, fields).await?;
        debug!(job_id = %job.job_id, "Updated job");
        Ok(())
    }

    /// Applies a partial progress update.
    ///
    /// Returns `Ok(None)` (after logging an error) when the job does not exist.
    pub async fn update_job_progress(
        &self,
        job_id: &str,
        update: JobProgressUpdate,
    ) -> Result<Option<Job>, PersistenceError> {
        let Some(stored) = self.get_job_record(job_id).await? else {
            error!(job_id, "Job not found");
            return Ok(None);
        };

        let fields = update.to_fields(stored.total_tasks)?;
        if fields.is_empty() {
            return Ok(Some(stored));
        }
        self.store.update(&self.collection, job_id, fields).await?;
        debug!(job_id, ?update, "Updated job progress");

        self.get_job_record(job_id).await
    }

    /// Adds a task to a job.
    pub async fn add_task(&self, job_id: &str, task: &Task) -> Result<(), PersistenceError> {
        self.store
            .set(
                &self.tasks_collection(job_id),
                &task.task_id,
                serde_json::to_value(task)?,
            )
            .await?;
        debug!(job_id, task_id = %task.task_id, "Added task");
        Ok(())
    }

    /// Overwrites the fields of an existing task.
    pub async fn update_task(&self, job_id: &str, task: &Task) -> Result<(), PersistenceError> {
        let serde_json::Value::Object(fields) = serde_json::to_value(task)? else {
            return Err(PersistenceError::backend("task did not serialize to an object"));
        };
        self.store
            .update(&self.tasks_collection(job_id), &task.task_id, fields)
            .await?;
        debug!(job_id, task_id = %task.task_id, status = %task.status, "Updated task");
        Ok(())
    }

    async fn get_job_record(&self, job_id: &str) -> Result<Option<Job>, PersistenceError> {
        self.store
            .get(&self.collection, job_id)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(PersistenceError::from)
    }

    /// Looks up a job, optionally with its tasks.
    pub async fn get_job(
        &self,
        job_id: &str,
        include_tasks: bool,
    ) -> Result<Option<JobView>, PersistenceError> {
        let Some(job) = self.get_job_record(job_id).await? else {
            return Ok(None);
        };
        let tasks = if include_tasks {
            Some(self.get_tasks(job_id).await?)
        } else {
            None
        };
        Ok(Some(JobView { job, tasks }))
    }

    /// Returns a job's tasks, earliest start first; unstarted tasks first.
    pub async fn get_tasks(&self, job_id: &str) -> Result<Vec<Task>, PersistenceError> {
        let query = Query::new().order_by("started_at", SortDirection::Ascending);
        self.store
            .query(&self.tasks_collection(job_id), &query)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(PersistenceError::from))
            .collect()
    }

    /// Returns up to `limit` jobs, most recently started first.
    pub async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, PersistenceError> {
        let query = Query::new()
            .order_by("started_at", SortDirection::Descending)
            .limit(limit);
        self.store
            .query(&self.collection, &query)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(PersistenceError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PipelineLayer, TaskStatus};
    use crate::storage::{InMemoryDocumentStore, MockDocumentStore};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn tracker() -> JobTracker {
        JobTracker::new(Arc::new(InMemoryDocumentStore::new()))
    }

    #[tokio::test]
    async fn test_create_job_defaults() {
        let tracker = tracker();
        let job = tracker.create_job("bronze.geo", 2, Some("u1")).await.unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.completed_tasks, 0);
        assert_eq!(job.user_id.as_deref(), Some("u1"));

        let view = tracker.get_job(&job.job_id, false).await.unwrap().unwrap();
        assert_eq!(view.job, job);
        assert!(view.tasks.is_none());
    }

    #[tokio::test]
    async fn test_progress_uses_stored_total() {
        let tracker = tracker();
        let job = tracker.create_job("j", 6, None).await.unwrap();

        let updated = tracker
            .update_job_progress(&job.job_id, JobProgressUpdate::new().completed_tasks(3))
            .await
            .unwrap()
            .unwrap();
        assert!((updated.progress_percent - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_progress_with_zero_total_is_zero() {
        let tracker = tracker();
        let job = tracker.create_job("j", 0, None).await.unwrap();

        let updated = tracker
            .update_job_progress(&job.job_id, JobProgressUpdate::new().completed_tasks(0))
            .await
            .unwrap()
            .unwrap();
        assert!(updated.progress_percent.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_update_missing_job_returns_none() {
        let tracker = tracker();
        let result = tracker
            .update_job_progress("nope", JobProgressUpdate::new().status(JobStatus::Running))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_tasks_sorted_by_start_with_unstarted_first() {
        let tracker = tracker();
        let job = tracker.create_job("j", 3, None).await.unwrap();
        let now = now_utc();

        let mut late = Task::new("late", "b", PipelineLayer::Silver);
        late.started_at = Some(now + Duration::seconds(5));
        let mut early = Task::new("early", "a", PipelineLayer::Bronze);
        early.started_at = Some(now);
        let unstarted = Task::new("unstarted", "c", PipelineLayer::Silver);

        for task in [&late, &early, &unstarted] {
            tracker.add_task(&job.job_id, task).await.unwrap();
        }

        let ids: Vec<String> = tracker
            .get_tasks(&job.job_id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.task_id)
            .collect();
        assert_eq!(ids, vec!["unstarted", "early", "late"]);
    }

    #[tokio::test]
    async fn test_update_task_and_include_tasks() {
        let tracker = tracker();
        let job = tracker.create_job("j", 1, None).await.unwrap();
        let mut task = Task::new("t1", "geo", PipelineLayer::Bronze);
        tracker.add_task(&job.job_id, &task).await.unwrap();

        task.status = TaskStatus::Success;
        task.message = "done".into();
        tracker.update_task(&job.job_id, &task).await.unwrap();

        let view = tracker.get_job(&job.job_id, true).await.unwrap().unwrap();
        let tasks = view.tasks.unwrap();
        assert_eq!(tasks, vec![task]);
    }

    #[tokio::test]
    async fn test_list_jobs_most_recent_first() {
        let tracker = tracker();
        let first = tracker.create_job("first", 0, None).await.unwrap();
        let mut second = tracker.create_job("second", 0, None).await.unwrap();
        second.started_at = first.started_at + Duration::seconds(1);
        tracker.update_job(&second).await.unwrap();

        let names: Vec<String> = tracker
            .list_jobs(10)
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.job_name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
        assert_eq!(tracker.list_jobs(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_surfaces() {
        let mut store = MockDocumentStore::new();
        store
            .expect_set()
            .returning(|_, _, _| Err(PersistenceError::backend("unavailable")));
        let tracker = JobTracker::new(Arc::new(store));

        let err = tracker.create_job("j", 1, None).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Backend(_)));
    }
}
