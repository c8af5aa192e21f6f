//! Job and task progress tracking.
//!
//! A job groups the tasks of one orchestration request; each task records a
//! single pipeline execution. Both are persisted through a
//! [`DocumentStore`](crate::storage::DocumentStore).

mod model;
mod tracker;

pub use model::{progress_percent, Job, JobProgressUpdate, JobView, Task};
pub use tracker::{JobTracker, JOBS_COLLECTION};
