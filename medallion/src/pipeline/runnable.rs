//! The contract every registered pipeline implements.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::core::RunOutcome;

/// A unit of work the executor can run.
///
/// Implementations are opaque to the engine: it only needs a name and a
/// `run(force)` that reports what happened. `force` asks the pipeline to
/// reprocess everything, ignoring checkpoints.
///
/// Returning `Err` is equivalent to returning [`RunOutcome::Failed`] with the
/// error text; panics are caught by the executor and reported the same way.
#[async_trait]
pub trait Runnable: Send + Sync + Debug {
    /// Returns the pipeline name.
    fn name(&self) -> &str;

    /// Runs the pipeline.
    async fn run(&self, force: bool) -> anyhow::Result<RunOutcome>;
}

/// A closure-backed runnable.
pub struct FnRunnable<F>
where
    F: Fn(bool) -> anyhow::Result<RunOutcome> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnRunnable<F>
where
    F: Fn(bool) -> anyhow::Result<RunOutcome> + Send + Sync,
{
    /// Creates a new closure-backed runnable.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnRunnable<F>
where
    F: Fn(bool) -> anyhow::Result<RunOutcome> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRunnable")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<F> Runnable for FnRunnable<F>
where
    F: Fn(bool) -> anyhow::Result<RunOutcome> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, force: bool) -> anyhow::Result<RunOutcome> {
        (self.func)(force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_runnable_passes_force() {
        let runnable = FnRunnable::new("geo", |force| {
            Ok(RunOutcome::success(u64::from(force), 0))
        });

        assert_eq!(runnable.name(), "geo");
        assert_eq!(runnable.run(true).await.unwrap().files_processed(), 1);
        assert_eq!(runnable.run(false).await.unwrap().files_processed(), 0);
    }

    #[tokio::test]
    async fn test_fn_runnable_error() {
        let runnable = FnRunnable::new("geo", |_| Err(anyhow::anyhow!("source unreachable")));
        let err = runnable.run(false).await.unwrap_err();
        assert_eq!(err.to_string(), "source unreachable");
    }
}
