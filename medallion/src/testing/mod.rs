//! Testing utilities for medallion pipelines.
//!
//! This module provides:
//! - Mock runnables with call tracking
//! - Runnables that fail, panic or sleep
//! - In-memory source and processor doubles for ingestion

mod ingest;
mod mocks;

pub use ingest::{MemorySource, RecordingProcessor};
pub use mocks::{FailingRunnable, MockRunnable, PanickingRunnable, RunLog, SlowRunnable};
