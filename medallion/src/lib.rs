//! # Medallion
//!
//! A dependency-aware orchestration engine for layered data pipelines.
//!
//! Pipelines live in one of three layers (bronze, silver, gold) and may
//! depend on pipelines of any layer. Medallion provides:
//!
//! - **Registration**: a layered registry filled by code or a JSON catalog
//! - **Dependency resolution**: topological ordering with cycle detection
//! - **Job tracking**: persisted jobs and tasks with progress counters
//! - **Idempotent ingestion**: per-file checkpoints keyed by pipeline
//! - **Cooperative cancellation** between sequential steps
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use medallion::prelude::*;
//!
//! let engine = Engine::in_memory();
//! engine.registry().register(
//!     PipelineLayer::Bronze, "geo", Arc::new(geo), vec![], PipelineMetadata::new(),
//! );
//! engine.registry().register(
//!     PipelineLayer::Silver, "geo", Arc::new(clean_geo),
//!     vec!["bronze.geo".into()], PipelineMetadata::new(),
//! );
//!
//! let (job_id, states) = engine
//!     .executor()
//!     .run_with_dependencies_job(PipelineLayer::Silver, "geo", false, None)
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod engine;
pub mod errors;
pub mod events;
pub mod ingest;
pub mod jobs;
pub mod observability;
pub mod pipeline;
pub mod storage;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::checkpoint::{CheckpointEntry, CheckpointStatus, CheckpointStore};
    pub use crate::config::{EngineConfig, LogConfig};
    pub use crate::core::{
        FileError, JobStatus, PipelineLayer, PipelineRef, PipelineStatus, RunOutcome, TaskStatus,
    };
    pub use crate::engine::Engine;
    pub use crate::errors::{
        CircularDependencyError, MedallionError, NotFoundError, PersistenceError, Result,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::ingest::{FileProcessor, FileSource, IngestionPipeline, LocalDirSource, WriteMode};
    pub use crate::jobs::{Job, JobProgressUpdate, JobTracker, JobView, Task};
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{
        resolve, validate_dependencies, Catalog, ExecutionState, FnRunnable, PipelineExecutor,
        PipelineMetadata, PipelineRegistry, Runnable, RunnableFactories, RunnableFactory,
    };
    pub use crate::storage::{DocumentStore, FileDocumentStore, InMemoryDocumentStore};
    pub use std::sync::Arc;
}
