//! The composition root.
//!
//! [`Engine`] builds the document store, registry, tracker, checkpoint
//! store and executor from an [`EngineConfig`] and hands out shared
//! references to them. Nothing in the crate is global.

use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::checkpoint::CheckpointStore;
use crate::config::EngineConfig;
use crate::core::PipelineLayer;
use crate::errors::{NotFoundError, ResourceKind, Result};
use crate::events::{EventSink, LoggingEventSink};
use crate::ingest::{local_ingestion_factory, FileProcessor};
use crate::jobs::{Job, JobTracker, JobView};
use crate::pipeline::{
    register_catalog, Catalog, CatalogReport, ExecutionState, PipelineExecutor, PipelineInfo,
    PipelineRegistry, RunnableFactories, RunnableFactory,
};
use crate::storage::{DocumentStore, FileDocumentStore, InMemoryDocumentStore};

/// Owns every engine component.
pub struct Engine {
    config: EngineConfig,
    store: Arc<dyn DocumentStore>,
    registry: Arc<PipelineRegistry>,
    checkpoints: CheckpointStore,
    executor: Arc<PipelineExecutor>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Opens an engine, logging orchestration events at debug level.
    pub async fn open(config: EngineConfig) -> Result<Self> {
        Self::open_with_events(config, Arc::new(LoggingEventSink::debug())).await
    }

    /// Opens an engine reporting orchestration events to `events`.
    ///
    /// Uses a [`FileDocumentStore`] when `store_dir` is set and an
    /// in-memory store otherwise.
    pub async fn open_with_events(config: EngineConfig, events: Arc<dyn EventSink>) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match &config.store_dir {
            Some(dir) => {
                info!(store_dir = %dir.display(), "Opening file document store");
                Arc::new(FileDocumentStore::open(dir).await?)
            }
            None => Arc::new(InMemoryDocumentStore::new()),
        };
        Ok(Self::with_store(config, store, events))
    }

    /// Builds an engine over an existing store.
    #[must_use]
    pub fn with_store(
        config: EngineConfig,
        store: Arc<dyn DocumentStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let registry = Arc::new(PipelineRegistry::new());
        let tracker = JobTracker::with_collection(store.clone(), config.jobs_collection.clone());
        let checkpoints =
            CheckpointStore::with_collection(store.clone(), config.checkpoints_collection.clone());
        let executor = Arc::new(
            PipelineExecutor::new(registry.clone(), tracker)
                .with_history_capacity(config.history_capacity)
                .with_event_sink(events),
        );

        Self {
            config,
            store,
            registry,
            checkpoints,
            executor,
        }
    }

    /// An in-memory engine with default configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_store(
            EngineConfig::default(),
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(LoggingEventSink::debug()),
        )
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PipelineRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    #[must_use]
    pub fn tracker(&self) -> &JobTracker {
        self.executor.tracker()
    }

    /// The shared executor; clone the `Arc` to run jobs in background tasks.
    #[must_use]
    pub fn executor(&self) -> &Arc<PipelineExecutor> {
        &self.executor
    }

    /// Registers a catalog into this engine's registry.
    pub fn register_catalog(&self, catalog: &Catalog, factories: &RunnableFactories) -> CatalogReport {
        register_catalog(&self.registry, catalog, factories)
    }

    /// A factory for local-directory ingestion sharing this engine's checkpoints.
    #[must_use]
    pub fn ingestion_factory(&self, processor: Arc<dyn FileProcessor>) -> RunnableFactory {
        local_ingestion_factory(self.checkpoints.clone(), processor)
    }

    /// Describes a registered pipeline.
    pub fn pipeline_info(&self, layer: PipelineLayer, name: &str) -> Result<PipelineInfo> {
        self.registry
            .descriptor(layer, name)
            .map(|d| d.info())
            .ok_or_else(|| NotFoundError::new(ResourceKind::Pipeline, format!("{layer}.{name}")).into())
    }

    /// Fetches a job, failing with [`NotFoundError`] when it does not exist.
    pub async fn job(&self, job_id: &str, include_tasks: bool) -> Result<JobView> {
        self.tracker()
            .get_job(job_id, include_tasks)
            .await?
            .ok_or_else(|| NotFoundError::new(ResourceKind::Job, job_id).into())
    }

    /// Fetches an execution from the in-memory history.
    pub fn execution(&self, run_id: &str) -> Result<ExecutionState> {
        self.executor
            .get_execution_state(run_id)
            .ok_or_else(|| NotFoundError::new(ResourceKind::Execution, run_id).into())
    }

    /// Lists jobs, newest first, up to `limit` or the configured default.
    pub async fn list_jobs(&self, limit: Option<usize>) -> Result<Vec<Job>> {
        let limit = limit.unwrap_or(self.config.default_list_limit);
        Ok(self.tracker().list_jobs(limit).await?)
    }
}
