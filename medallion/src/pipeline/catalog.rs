//! Declarative pipeline catalog.
//!
//! A catalog lists pipelines per layer as JSON. Each entry names the
//! runnable factory that builds its implementation; factories are registered
//! explicitly at startup, so binding a catalog never loads code by name.
//!
//! ```json
//! {
//!   "bronze": [{"name": "geo", "target_table": "bronze_geo", "runnable": "local_ingest",
//!               "source_path": "raw/geo"}],
//!   "silver": [{"name": "geo", "target_table": "silver_geo", "runnable": "sql",
//!               "dependencies": ["bronze.geo"]}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::resolver::find_violations;
use super::{PipelineMetadata, PipelineRegistry, Runnable};
use crate::core::{PipelineLayer, PipelineRef};
use crate::errors::{DependencyViolation, MedallionError, Result};

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name, unique within its layer.
    pub name: String,
    /// Table the pipeline writes.
    pub target_table: String,
    /// Key of the [`RunnableFactory`] that builds the implementation.
    pub runnable: String,
    /// English description.
    #[serde(default)]
    pub description: Option<String>,
    /// French description.
    #[serde(default)]
    pub description_fr: Option<String>,
    /// `layer.name` references.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Input directory for ingestion pipelines.
    #[serde(default)]
    pub source_path: Option<String>,
}

impl PipelineConfig {
    fn metadata(&self) -> PipelineMetadata {
        PipelineMetadata {
            description: self.description.clone(),
            description_fr: self.description_fr.clone(),
            target_table: Some(self.target_table.clone()),
            source_path: self.source_path.clone(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Pipeline definitions for every layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Bronze entries, in registration order.
    #[serde(default)]
    pub bronze: Vec<PipelineConfig>,
    /// Silver entries.
    #[serde(default)]
    pub silver: Vec<PipelineConfig>,
    /// Gold entries.
    #[serde(default)]
    pub gold: Vec<PipelineConfig>,
}

impl Catalog {
    /// Parses a catalog from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| MedallionError::Config(format!("invalid pipeline catalog: {e}")))
    }

    /// Reads and parses a catalog file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json_str(&raw)?;
        info!(path = %path.display(), pipelines = catalog.len(), "Loaded pipeline catalog");
        Ok(catalog)
    }

    /// Returns the entries of one layer.
    #[must_use]
    pub fn layer(&self, layer: PipelineLayer) -> &[PipelineConfig] {
        match layer {
            PipelineLayer::Bronze => &self.bronze,
            PipelineLayer::Silver => &self.silver,
            PipelineLayer::Gold => &self.gold,
        }
    }

    /// Iterates every entry, bronze first.
    pub fn pipelines(&self) -> impl Iterator<Item = (PipelineLayer, &PipelineConfig)> {
        PipelineLayer::ALL
            .into_iter()
            .flat_map(move |layer| self.layer(layer).iter().map(move |c| (layer, c)))
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bronze.len() + self.silver.len() + self.gold.len()
    }

    /// Returns true if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks every declared dependency against the catalog's own entries.
    #[must_use]
    pub fn validate_dependencies(&self) -> Vec<DependencyViolation> {
        let available: HashSet<PipelineRef> = self
            .pipelines()
            .map(|(layer, c)| PipelineRef::new(layer, c.name.clone()))
            .collect();
        let declared: Vec<(String, Vec<String>)> = self
            .pipelines()
            .map(|(layer, c)| (format!("{layer}.{}", c.name), c.dependencies.clone()))
            .collect();
        find_violations(&declared, |p| available.contains(p))
    }
}

type FactoryFn =
    dyn Fn(PipelineLayer, &PipelineConfig) -> anyhow::Result<Arc<dyn Runnable>> + Send + Sync;

/// Builds runnables for catalog entries.
#[derive(Clone)]
pub struct RunnableFactory {
    build: Arc<FactoryFn>,
}

impl RunnableFactory {
    /// Wraps a builder closure.
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(PipelineLayer, &PipelineConfig) -> anyhow::Result<Arc<dyn Runnable>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            build: Arc::new(build),
        }
    }

    /// Builds the runnable for an entry.
    pub fn build(
        &self,
        layer: PipelineLayer,
        config: &PipelineConfig,
    ) -> anyhow::Result<Arc<dyn Runnable>> {
        (self.build)(layer, config)
    }
}

impl fmt::Debug for RunnableFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableFactory").finish_non_exhaustive()
    }
}

/// Named runnable factories available to catalogs.
#[derive(Debug, Clone, Default)]
pub struct RunnableFactories {
    factories: BTreeMap<String, RunnableFactory>,
}

impl RunnableFactories {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a factory under `key`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, factory: RunnableFactory) -> Self {
        self.insert(key, factory);
        self
    }

    /// Adds (or replaces) a factory under `key`.
    pub fn insert(&mut self, key: impl Into<String>, factory: RunnableFactory) {
        self.factories.insert(key.into(), factory);
    }

    /// Looks up a factory.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RunnableFactory> {
        self.factories.get(key)
    }
}

/// A catalog entry that was not registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPipeline {
    /// `layer.name`.
    pub pipeline: String,
    /// Why it was skipped.
    pub reason: String,
}

/// What [`register_catalog`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    /// Registered pipelines, `layer.name`, in catalog order.
    pub registered: Vec<String>,
    /// Entries whose factory was unknown or failed.
    pub skipped: Vec<SkippedPipeline>,
    /// Dependencies that do not resolve within the catalog.
    pub violations: Vec<DependencyViolation>,
}

impl CatalogReport {
    /// Returns true if every entry registered and every dependency resolves.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.violations.is_empty()
    }
}

/// Registers every catalog entry whose factory is known.
///
/// Unknown factory keys and factory errors skip the entry with an error log;
/// dependency violations are logged as warnings and do not block
/// registration.
pub fn register_catalog(
    registry: &PipelineRegistry,
    catalog: &Catalog,
    factories: &RunnableFactories,
) -> CatalogReport {
    let mut report = CatalogReport {
        violations: catalog.validate_dependencies(),
        ..CatalogReport::default()
    };
    if !report.violations.is_empty() {
        warn!(count = report.violations.len(), "Some pipeline dependencies are invalid");
    }

    for (layer, config) in catalog.pipelines() {
        let full_name = format!("{layer}.{}", config.name);
        let built = factories
            .get(&config.runnable)
            .ok_or_else(|| anyhow::anyhow!("unknown runnable factory '{}'", config.runnable))
            .and_then(|factory| factory.build(layer, config));

        match built {
            Ok(runnable) => {
                registry.register(
                    layer,
                    config.name.clone(),
                    runnable,
                    config.dependencies.clone(),
                    config.metadata(),
                );
                report.registered.push(full_name);
            }
            Err(e) => {
                error!(pipeline = %full_name, error = %e, "Failed to register pipeline");
                report.skipped.push(SkippedPipeline {
                    pipeline: full_name,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        registered = report.registered.len(),
        skipped = report.skipped.len(),
        "Registered pipeline catalog"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRunnable;
    use pretty_assertions::assert_eq;

    const CATALOG: &str = r#"{
        "bronze": [
            {"name": "geo", "target_table": "bronze_geo", "runnable": "mock",
             "description_fr": "Communes", "source_path": "raw/geo"}
        ],
        "silver": [
            {"name": "geo", "target_table": "silver_geo", "runnable": "mock",
             "dependencies": ["bronze.geo"]},
            {"name": "gares", "target_table": "silver_gares", "runnable": "sql",
             "dependencies": ["bronze.transport"]}
        ]
    }"#;

    fn factories() -> RunnableFactories {
        RunnableFactories::new().with(
            "mock",
            RunnableFactory::new(|_, config| {
                Ok(Arc::new(MockRunnable::new(config.name.clone())) as Arc<dyn Runnable>)
            }),
        )
    }

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_json_str(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.gold.is_empty());
        assert_eq!(catalog.bronze[0].source_path.as_deref(), Some("raw/geo"));
        assert!(catalog.bronze[0].dependencies.is_empty());
    }

    #[test]
    fn test_invalid_catalog_is_config_error() {
        let err = Catalog::from_json_str("{\"bronze\": [{}]}").unwrap_err();
        assert!(matches!(err, MedallionError::Config(_)));
    }

    #[test]
    fn test_catalog_validation() {
        let catalog = Catalog::from_json_str(CATALOG).unwrap();
        let violations = catalog.validate_dependencies();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].pipeline, "silver.gares");
        assert_eq!(violations[0].dependency, "bronze.transport");
    }

    #[test]
    fn test_register_catalog_skips_unknown_factories() {
        let registry = PipelineRegistry::new();
        let catalog = Catalog::from_json_str(CATALOG).unwrap();

        let report = register_catalog(&registry, &catalog, &factories());

        assert_eq!(report.registered, vec!["bronze.geo", "silver.geo"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].pipeline, "silver.gares");
        assert!(!report.is_clean());

        let descriptor = registry.descriptor(PipelineLayer::Bronze, "geo").unwrap();
        assert_eq!(descriptor.metadata.target_table.as_deref(), Some("bronze_geo"));
        assert_eq!(descriptor.metadata.description_fr.as_deref(), Some("Communes"));
        assert_eq!(
            registry.get_dependencies(PipelineLayer::Silver, "geo"),
            vec!["bronze.geo".to_string()]
        );
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipelines.json");
        tokio::fs::write(&path, CATALOG).await.unwrap();

        let catalog = Catalog::load(&path).await.unwrap();
        assert_eq!(catalog.silver.len(), 2);
    }
}
