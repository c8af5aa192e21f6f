//! Document persistence for jobs, tasks and checkpoints.
//!
//! This module provides:
//! - The [`DocumentStore`] contract and its query model
//! - An in-memory implementation
//! - A JSON-file implementation for single-node deployments

mod document;
mod file;
mod memory;

pub use document::{compare_values, DocumentStore, FieldFilter, OrderBy, Query, SortDirection};
#[cfg(test)]
pub use document::MockDocumentStore;
pub use file::FileDocumentStore;
pub use memory::InMemoryDocumentStore;
