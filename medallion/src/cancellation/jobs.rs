//! Tokens for the jobs currently running in an executor.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

use super::CancellationToken;

/// Active job id to cancellation token.
///
/// Cancelling and finishing take the same lock, so a job is either
/// cancelled before it finishes or not at all.
#[derive(Debug, Default)]
pub struct JobCancellations {
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl JobCancellations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `job_id` active. Re-activating keeps the existing token.
    pub fn activate(&self, job_id: &str) {
        self.active.lock().entry(job_id.to_string()).or_default();
    }

    /// Trips the token of an active job.
    ///
    /// Returns false if the job is not active or was already cancelled.
    pub fn cancel(&self, job_id: &str) -> bool {
        self.active
            .lock()
            .get(job_id)
            .is_some_and(CancellationToken::cancel)
    }

    /// Forgets a job once it has finished, returning whether it was cancelled.
    pub fn finish(&self, job_id: &str) -> bool {
        match self.active.lock().remove(job_id) {
            Some(token) => {
                debug!(job_id, "Job no longer active");
                token.is_cancelled()
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_active(&self, job_id: &str) -> bool {
        self.active.lock().contains_key(job_id)
    }

    /// Returns true if `job_id` is active and its token tripped.
    #[must_use]
    pub fn is_cancelled(&self, job_id: &str) -> bool {
        self.active
            .lock()
            .get(job_id)
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_only_active_jobs() {
        let jobs = JobCancellations::new();
        assert!(!jobs.cancel("j1"));

        jobs.activate("j1");
        assert!(jobs.cancel("j1"));
        assert!(jobs.is_cancelled("j1"));
        assert!(!jobs.cancel("j1"));

        assert!(jobs.finish("j1"));
        assert!(!jobs.is_active("j1"));
        assert!(!jobs.is_cancelled("j1"));
        assert!(!jobs.cancel("j1"));
    }

    #[test]
    fn test_activate_keeps_existing_token() {
        let jobs = JobCancellations::new();
        jobs.activate("j1");
        jobs.cancel("j1");
        jobs.activate("j1");
        assert!(jobs.is_cancelled("j1"));
    }

    #[test]
    fn test_finish_reports_uncancelled_job() {
        let jobs = JobCancellations::new();
        jobs.activate("j1");
        assert!(!jobs.finish("j1"));
        assert!(!jobs.finish("j1"));
    }
}
