//! Cooperative job cancellation.
//!
//! Cancellation is a flag the executor checks between sequential steps;
//! work already in flight runs to completion.

mod jobs;
mod token;

pub use jobs::JobCancellations;
pub use token::CancellationToken;
