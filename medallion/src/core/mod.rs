//! Core domain model types for medallion.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Pipeline layers and `layer.name` references
//! - Execution, job and task status enums
//! - The tagged run outcome returned by pipelines

mod layer;
mod outcome;
mod status;

pub use layer::{PipelineLayer, PipelineRef};
pub use outcome::{FileError, RunOutcome};
pub use status::{JobStatus, PipelineStatus, TaskStatus};
