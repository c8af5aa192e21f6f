//! Checkpoints that make file ingestion idempotent across runs.

mod hash;
mod store;

pub use hash::compute_file_hash;
pub use store::{CheckpointEntry, CheckpointStatus, CheckpointStore, CHECKPOINT_COLLECTION};
