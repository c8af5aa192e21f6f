//! Orchestration events.
//!
//! The executor reports pipeline and job lifecycle changes to an
//! [`EventSink`]. Event names are listed in [`names`].

mod sink;

pub use sink::{CollectingEventSink, Event, EventSink, LoggingEventSink, NoOpEventSink};

/// Event names emitted by the executor.
#[allow(missing_docs)]
pub mod names {
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    pub const PIPELINE_FAILED: &str = "pipeline.failed";
    pub const JOB_STARTED: &str = "job.started";
    pub const JOB_COMPLETED: &str = "job.completed";
    pub const JOB_CANCELLED: &str = "job.cancelled";
}
