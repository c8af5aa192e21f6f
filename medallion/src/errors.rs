//! Error types for the medallion orchestration engine.
//!
//! Resolution errors abort a request before any side effect, persistence
//! errors bubble to the immediate caller, and execution errors are recorded
//! on the execution state and task instead of being propagated.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Convenience result alias used across the crate.
pub type Result<T, E = MedallionError> = std::result::Result<T, E>;

/// The main error type for medallion operations.
#[derive(Debug, Error)]
pub enum MedallionError {
    /// A pipeline, job or other resource does not exist.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// Dependency resolution found a cycle.
    #[error("{0}")]
    CircularDependency(#[from] CircularDependencyError),

    /// A dependency reference is not of the form `layer.name`.
    #[error("Invalid pipeline reference '{0}': expected 'layer.name' with layer one of bronze, silver, gold")]
    InvalidReference(String),

    /// A document store call failed.
    #[error("{0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration could not be loaded or applied.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MedallionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Kind of resource a [`NotFoundError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A registered pipeline.
    Pipeline,
    /// A tracked job.
    Job,
    /// An execution in the in-memory history.
    Execution,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipeline => write!(f, "Pipeline"),
            Self::Job => write!(f, "Job"),
            Self::Execution => write!(f, "Execution"),
        }
    }
}

/// Raised when a lookup misses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} {id} not found")]
pub struct NotFoundError {
    /// What was looked up.
    pub kind: ResourceKind,
    /// The identifier that missed.
    pub id: String,
}

impl NotFoundError {
    /// Creates a new not-found error.
    #[must_use]
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Raised when a pipeline is reached again along its own dependency path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circular dependency detected: {pipeline} (path: {})", path.join(" -> "))]
pub struct CircularDependencyError {
    /// The pipeline (`layer.name`) that closed the cycle.
    pub pipeline: String,
    /// The recursion path from the resolution target to the repeated pipeline.
    pub path: Vec<String>,
}

impl CircularDependencyError {
    /// Creates a new circular dependency error.
    #[must_use]
    pub fn new(pipeline: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            path,
        }
    }
}

/// Errors raised by a [`DocumentStore`](crate::storage::DocumentStore).
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backend rejected or failed the call.
    #[error("Persistence backend error: {0}")]
    Backend(String),

    /// An update targeted a document that does not exist.
    #[error("Document {collection}/{id} does not exist")]
    MissingDocument {
        /// Collection name.
        collection: String,
        /// Document id.
        id: String,
    },

    /// A stored document could not be (de)serialized.
    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure in a file-backed store.
    #[error("Document store IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PersistenceError {
    /// Wraps any displayable backend failure.
    pub fn backend(err: impl fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Why a single pipeline execution failed.
///
/// Never propagated: the executor renders it into the execution state and
/// task `error` fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The pipeline is not registered.
    #[error("Pipeline {0} not found")]
    NotFound(String),

    /// `run` returned an error.
    #[error("{0}")]
    Raised(String),

    /// `run` panicked.
    #[error("Pipeline panicked: {0}")]
    Panicked(String),
}

/// One unresolved dependency found by a validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyViolation {
    /// The declaring pipeline (`layer.name`).
    pub pipeline: String,
    /// The dependency string that does not resolve.
    pub dependency: String,
}

impl fmt::Display for DependencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pipeline {} depends on {}, but {} is not registered",
            self.pipeline, self.dependency, self.dependency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = NotFoundError::new(ResourceKind::Job, "abc");
        assert_eq!(err.to_string(), "Job abc not found");

        let wrapped: MedallionError = err.into();
        assert!(matches!(wrapped, MedallionError::NotFound(_)));
    }

    #[test]
    fn test_circular_dependency_display() {
        let err = CircularDependencyError::new(
            "silver.x",
            vec!["silver.x".to_string(), "silver.y".to_string()],
        );
        let msg = err.to_string();
        assert!(msg.starts_with("Circular dependency detected: silver.x"));
        assert!(msg.contains("silver.x -> silver.y"));
    }

    #[test]
    fn test_execution_error_messages() {
        assert_eq!(
            ExecutionError::NotFound("bronze.geo".into()).to_string(),
            "Pipeline bronze.geo not found"
        );
        assert_eq!(ExecutionError::Raised("boom".into()).to_string(), "boom");
    }

    #[test]
    fn test_persistence_error_converts() {
        let err: MedallionError = PersistenceError::backend("timeout").into();
        assert_eq!(err.to_string(), "Persistence backend error: timeout");
    }

    #[test]
    fn test_dependency_violation_display() {
        let v = DependencyViolation {
            pipeline: "silver.geo".into(),
            dependency: "bronze.missing".into(),
        };
        assert!(v.to_string().contains("bronze.missing is not registered"));
    }
}
