//! Checkpointed file ingestion.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use super::{FileProcessor, FileSource, WriteMode};
use crate::checkpoint::{compute_file_hash, CheckpointStatus, CheckpointStore};
use crate::core::{FileError, RunOutcome};
use crate::pipeline::Runnable;

/// A bronze-style runnable that ingests each new source file once.
///
/// Files already checkpointed as successful are skipped. In force mode the
/// pipeline's checkpoints are cleared first, every listed file is processed,
/// and the first file written replaces the table.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    name: String,
    source: Arc<dyn FileSource>,
    processor: Arc<dyn FileProcessor>,
    checkpoints: CheckpointStore,
    write_mode: WriteMode,
}

impl IngestionPipeline {
    /// Creates an ingestion pipeline appending to its table.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn FileSource>,
        processor: Arc<dyn FileProcessor>,
        checkpoints: CheckpointStore,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            processor,
            checkpoints,
            write_mode: WriteMode::default(),
        }
    }

    /// Sets the write mode used outside the force-mode first file.
    #[must_use]
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    async fn files_to_process(&self, force: bool) -> anyhow::Result<Vec<String>> {
        let all_files = self.source.list_files().await?;
        if force {
            info!(pipeline = %self.name, files = all_files.len(), "Force mode: processing all files");
            return Ok(all_files);
        }
        Ok(self.checkpoints.get_new_files(&self.name, &all_files).await?)
    }
}

#[async_trait]
impl Runnable for IngestionPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, force: bool) -> anyhow::Result<RunOutcome> {
        info!(pipeline = %self.name, force, "Running ingestion pipeline");

        if force {
            info!(pipeline = %self.name, "Force mode enabled, clearing checkpoints");
            self.checkpoints.clear_checkpoints(&self.name).await?;
        }

        let files = self.files_to_process(force).await?;
        if files.is_empty() {
            info!(pipeline = %self.name, "No new files to process");
            return Ok(RunOutcome::ok_empty().with_message("No new files to process"));
        }

        // Force mode replaces the table with the first file that gets written.
        let mut overwrite_pending = force;

        let mut files_processed = 0u64;
        let mut rows_processed = 0u64;
        let mut errors = Vec::new();

        for path in &files {
            info!(pipeline = %self.name, file = %path, "Processing file");
            let ingested = async {
                let contents = self.source.read_file(path).await?;
                let mode = if std::mem::take(&mut overwrite_pending) {
                    WriteMode::Overwrite
                } else {
                    self.write_mode
                };
                let rows = self.processor.process(path, &contents, mode).await?;
                Ok::<_, anyhow::Error>((rows, compute_file_hash(&contents)))
            }
            .await;

            match ingested {
                Ok((rows, hash)) => {
                    self.checkpoints
                        .mark_file_processed(&self.name, path, &hash, rows, CheckpointStatus::Success)
                        .await?;
                    files_processed += 1;
                    rows_processed += rows;
                    info!(pipeline = %self.name, file = %path, rows, "Processed file");
                }
                Err(e) => {
                    error!(pipeline = %self.name, file = %path, error = %e, "Error processing file");
                    errors.push(FileError::new(path.clone(), format!("{e:#}")));
                    self.checkpoints
                        .mark_file_processed(&self.name, path, "", 0, CheckpointStatus::Failed)
                        .await?;
                }
            }
        }

        let outcome = if errors.is_empty() {
            let message = format!(
                "Successfully processed {files_processed} file(s), {rows_processed} rows"
            );
            RunOutcome::success(files_processed, rows_processed).with_message(message)
        } else {
            let message = format!("Processed {files_processed} files with {} errors", errors.len());
            RunOutcome::partial(files_processed, rows_processed, errors).with_message(message)
        };
        Ok(outcome)
    }
}
