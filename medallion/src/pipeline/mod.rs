//! Pipeline registration, resolution and execution.
//!
//! This module provides:
//! - The [`Runnable`] contract pipelines implement
//! - A layered registry and a JSON catalog that fills it
//! - Dependency resolution with cycle detection
//! - The executor, its per-run state and bounded history

mod catalog;
mod executor;
mod history;
mod registry;
mod resolver;
mod runnable;
mod state;


pub use catalog::{
    register_catalog, Catalog, CatalogReport, PipelineConfig, RunnableFactories, RunnableFactory,
    SkippedPipeline,
};
pub use executor::{full_pipeline_job_name, PipelineExecutor};
pub use history::{ExecutionHistory, DEFAULT_HISTORY_CAPACITY};
pub use registry::{PipelineDescriptor, PipelineInfo, PipelineMetadata, PipelineRegistry};
pub use resolver::{resolve, validate_dependencies};
pub use runnable::{FnRunnable, Runnable};
pub use state::{ExecutionState, ExecutionSummary};
