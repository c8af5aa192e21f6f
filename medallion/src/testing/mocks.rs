//! Mock runnables for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::core::RunOutcome;
use crate::pipeline::Runnable;

/// Shared, ordered record of which runnables ran.
pub type RunLog = Arc<Mutex<Vec<String>>>;

/// A runnable that returns a configurable outcome and counts calls.
#[derive(Debug)]
pub struct MockRunnable {
    name: String,
    outcome: Mutex<RunOutcome>,
    force_flags: Mutex<Vec<bool>>,
    log: Option<RunLog>,
}

impl MockRunnable {
    /// Creates a mock that succeeds with no counters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: Mutex::new(RunOutcome::ok_empty()),
            force_flags: Mutex::new(Vec::new()),
            log: None,
        }
    }

    /// Creates a mock returning `outcome`.
    #[must_use]
    pub fn with_outcome(name: impl Into<String>, outcome: RunOutcome) -> Self {
        let mock = Self::new(name);
        mock.set_outcome(outcome);
        mock
    }

    /// Appends this runnable's name to `log` on every run.
    #[must_use]
    pub fn logging_to(mut self, log: RunLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Sets the outcome returned by later runs.
    pub fn set_outcome(&self, outcome: RunOutcome) {
        *self.outcome.lock() = outcome;
    }

    /// Number of times `run` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.force_flags.lock().len()
    }

    /// The `force` argument of every call, in order.
    #[must_use]
    pub fn force_flags(&self) -> Vec<bool> {
        self.force_flags.lock().clone()
    }
}

#[async_trait]
impl Runnable for MockRunnable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, force: bool) -> anyhow::Result<RunOutcome> {
        self.force_flags.lock().push(force);
        if let Some(log) = &self.log {
            log.lock().push(self.name.clone());
        }
        Ok(self.outcome.lock().clone())
    }
}

/// A runnable whose `run` returns an error.
#[derive(Debug)]
pub struct FailingRunnable {
    name: String,
    error: String,
}

impl FailingRunnable {
    #[must_use]
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
        }
    }
}

#[async_trait]
impl Runnable for FailingRunnable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _force: bool) -> anyhow::Result<RunOutcome> {
        Err(anyhow::anyhow!(self.error.clone()))
    }
}

/// A runnable that panics.
#[derive(Debug)]
pub struct PanickingRunnable {
    name: String,
}

impl PanickingRunnable {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Runnable for PanickingRunnable {
    fn name(&self) -> &str {
        &self.name
    }

    #[allow(clippy::panic)]
    async fn run(&self, _force: bool) -> anyhow::Result<RunOutcome> {
        panic!("{} exploded", self.name)
    }
}

/// A runnable that sleeps before succeeding.
#[derive(Debug)]
pub struct SlowRunnable {
    inner: MockRunnable,
    delay: Duration,
}

impl SlowRunnable {
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockRunnable::new(name),
            delay,
        }
    }

    /// Creates a slow runnable with a delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(name: impl Into<String>, ms: u64) -> Self {
        Self::new(name, Duration::from_millis(ms))
    }

    /// Returns `outcome` once the delay has passed.
    #[must_use]
    pub fn returning(self, outcome: RunOutcome) -> Self {
        self.inner.set_outcome(outcome);
        self
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.call_count()
    }
}

#[async_trait]
impl Runnable for SlowRunnable {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn run(&self, force: bool) -> anyhow::Result<RunOutcome> {
        tokio::time::sleep(self.delay).await;
        self.inner.run(force).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::panic::AssertUnwindSafe;

    #[tokio::test]
    async fn test_mock_runnable_records_calls() {
        let log = RunLog::default();
        let mock = MockRunnable::new("geo").logging_to(log.clone());

        assert!(mock.run(false).await.unwrap().is_success());
        mock.set_outcome(RunOutcome::failed("boom"));
        assert_eq!(mock.run(true).await.unwrap().error(), Some("boom"));

        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.force_flags(), vec![false, true]);
        assert_eq!(*log.lock(), vec!["geo", "geo"]);
    }

    #[tokio::test]
    async fn test_failing_runnable_errors() {
        let runnable = FailingRunnable::new("geo", "disk full");
        assert_eq!(runnable.run(false).await.unwrap_err().to_string(), "disk full");
    }

    #[tokio::test]
    async fn test_panicking_runnable_panics() {
        let runnable = PanickingRunnable::new("geo");
        let result = AssertUnwindSafe(runnable.run(false)).catch_unwind().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_slow_runnable_delegates() {
        let runnable = SlowRunnable::with_delay_ms("geo", 1);
        assert!(runnable.run(false).await.unwrap().is_success());
        assert_eq!(runnable.call_count(), 1);
    }
}
