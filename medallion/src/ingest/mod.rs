//! Idempotent file ingestion for bronze pipelines.
//!
//! [`IngestionPipeline`] lists files from a [`FileSource`], skips the ones
//! its checkpoints mark as done, hands each remaining file to a
//! [`FileProcessor`] and records a checkpoint per file.

mod pipeline;
mod source;

pub use pipeline::IngestionPipeline;
pub use source::{FileProcessor, FileSource, LocalDirSource, WriteMode};

use std::sync::Arc;

use crate::checkpoint::CheckpointStore;
use crate::pipeline::{Runnable, RunnableFactory};

/// Catalog factory building an [`IngestionPipeline`] over the entry's
/// `source_path` directory.
///
/// Entries without a `source_path` fail to build and are skipped.
#[must_use]
pub fn local_ingestion_factory(
    checkpoints: CheckpointStore,
    processor: Arc<dyn FileProcessor>,
) -> RunnableFactory {
    RunnableFactory::new(move |_layer, config| {
        let root = config.source_path.as_deref().ok_or_else(|| {
            anyhow::anyhow!("pipeline '{}' has no source_path", config.name)
        })?;
        let pipeline = IngestionPipeline::new(
            config.name.clone(),
            Arc::new(LocalDirSource::new(root)),
            processor.clone(),
            checkpoints.clone(),
        );
        Ok(Arc::new(pipeline) as Arc<dyn Runnable>)
    })
}
