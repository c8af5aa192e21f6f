//! Append-only per-pipeline checkpoint log.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::errors::PersistenceError;
use crate::storage::{DocumentStore, FieldFilter, Query};
use crate::utils::{generate_id, now_utc, Timestamp};

/// Default collection checkpoints are stored in.
pub const CHECKPOINT_COLLECTION: &str = "checkpoints";

/// Outcome recorded for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    /// The file was fully processed; it will be skipped on later runs.
    Success,
    /// Processing failed; the file is retried on the next run.
    Failed,
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One row of the checkpoint log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    /// Document id.
    pub checkpoint_id: String,
    /// Owning pipeline name.
    pub pipeline_name: String,
    /// Source file path as listed by the file source.
    pub file_path: String,
    /// Hex md5 of the file contents; empty for failed entries.
    pub file_hash: String,
    /// When the entry was recorded.
    pub processed_at: Timestamp,
    /// Recorded outcome.
    pub status: CheckpointStatus,
    /// Rows written for this file.
    pub rows_processed: u64,
}

/// Tracks which input files each pipeline has already processed.
#[derive(Clone)]
pub struct CheckpointStore {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl fmt::Debug for CheckpointStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckpointStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl CheckpointStore {
    /// Creates a checkpoint store over the default collection.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_collection(store, CHECKPOINT_COLLECTION)
    }

    /// Creates a checkpoint store over a custom collection.
    #[must_use]
    pub fn with_collection(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Returns every entry recorded for `pipeline`, in append order.
    pub async fn entries(&self, pipeline: &str) -> Result<Vec<CheckpointEntry>, PersistenceError> {
        let query = Query::new().where_eq("pipeline_name", pipeline);
        self.store
            .query(&self.collection, &query)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(PersistenceError::from))
            .collect()
    }

    /// Returns the paths `pipeline` has processed successfully.
    pub async fn get_processed_files(
        &self,
        pipeline: &str,
    ) -> Result<HashSet<String>, PersistenceError> {
        let query = Query::new()
            .where_eq("pipeline_name", pipeline)
            .where_eq("status", CheckpointStatus::Success.to_string());
        let processed: HashSet<String> = self
            .store
            .query(&self.collection, &query)
            .await?
            .iter()
            .filter_map(|doc| doc.get("file_path").and_then(|p| p.as_str()))
            .map(str::to_string)
            .collect();

        info!(pipeline, count = processed.len(), "Loaded processed files");
        Ok(processed)
    }

    /// Filters `candidates` down to files not yet processed, keeping input order.
    pub async fn get_new_files(
        &self,
        pipeline: &str,
        candidates: &[String],
    ) -> Result<Vec<String>, PersistenceError> {
        let processed = self.get_processed_files(pipeline).await?;
        let new_files: Vec<String> = candidates
            .iter()
            .filter(|f| !processed.contains(*f))
            .cloned()
            .collect();

        info!(
            pipeline,
            new = new_files.len(),
            total = candidates.len(),
            "Filtered new files"
        );
        Ok(new_files)
    }

    /// Appends a checkpoint entry.
    pub async fn mark_file_processed(
        &self,
        pipeline: &str,
        file_path: &str,
        file_hash: &str,
        rows_processed: u64,
        status: CheckpointStatus,
    ) -> Result<CheckpointEntry, PersistenceError> {
        let entry = CheckpointEntry {
            checkpoint_id: generate_id(),
            pipeline_name: pipeline.to_string(),
            file_path: file_path.to_string(),
            file_hash: file_hash.to_string(),
            processed_at: now_utc(),
            status,
            rows_processed,
        };
        self.store
            .set(
                &self.collection,
                &entry.checkpoint_id,
                serde_json::to_value(&entry)?,
            )
            .await?;

        info!(pipeline, file = file_path, %status, "Recorded checkpoint");
        Ok(entry)
    }

    /// Removes every entry for `pipeline`, leaving other pipelines untouched.
    pub async fn clear_checkpoints(&self, pipeline: &str) -> Result<usize, PersistenceError> {
        let removed = self
            .store
            .delete_where(&self.collection, &[FieldFilter::eq("pipeline_name", pipeline)])
            .await?;
        info!(pipeline, removed, "Cleared checkpoints");
        Ok(removed)
    }
}
