//! Registry of runnable pipelines keyed by `(layer, name)`.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::Runnable;
use crate::core::{PipelineLayer, PipelineRef};

/// Descriptive metadata attached to a registered pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// One-line description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// French description shown to end users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_fr: Option<String>,
    /// Table the pipeline writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
    /// Where the pipeline reads raw inputs from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    /// Free-form extra attributes.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl PipelineMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the French description.
    #[must_use]
    pub fn with_description_fr(mut self, description: impl Into<String>) -> Self {
        self.description_fr = Some(description.into());
        self
    }

    /// Sets the target table.
    #[must_use]
    pub fn with_target_table(mut self, table: impl Into<String>) -> Self {
        self.target_table = Some(table.into());
        self
    }

    /// Sets the source path.
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }
}

/// A registered pipeline.
#[derive(Debug, Clone)]
pub struct PipelineDescriptor {
    /// Layer.
    pub layer: PipelineLayer,
    /// Name, unique within the layer.
    pub name: String,
    /// Declared dependencies as `layer.name` strings, in declaration order.
    pub dependencies: Vec<String>,
    /// Descriptive metadata.
    pub metadata: PipelineMetadata,
    /// The implementation.
    pub runnable: Arc<dyn Runnable>,
}

impl PipelineDescriptor {
    /// Returns the `(layer, name)` reference.
    #[must_use]
    pub fn pipeline_ref(&self) -> PipelineRef {
        PipelineRef::new(self.layer, self.name.clone())
    }

    /// Returns the `layer.name` form.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.layer, self.name)
    }

    /// Returns the serializable listing view.
    #[must_use]
    pub fn info(&self) -> PipelineInfo {
        PipelineInfo {
            name: self.name.clone(),
            layer: self.layer,
            description: self.metadata.description.clone(),
            description_fr: self.metadata.description_fr.clone(),
            target_table: self.metadata.target_table.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

/// Listing entry for a registered pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInfo {
    /// Pipeline name.
    pub name: String,
    /// Pipeline layer.
    pub layer: PipelineLayer,
    /// English description.
    pub description: Option<String>,
    /// French description.
    pub description_fr: Option<String>,
    /// Table the pipeline writes.
    pub target_table: Option<String>,
    /// Declared `layer.name` dependencies.
    pub dependencies: Vec<String>,
}

/// Maps `(layer, name)` to a runnable plus its dependencies and metadata.
///
/// Registration order is preserved per layer and drives execution order for
/// full runs. Dependencies are not validated at registration time; see
/// [`validate_dependencies`](super::validate_dependencies).
#[derive(Debug, Default)]
pub struct PipelineRegistry {
    layers: RwLock<BTreeMap<PipelineLayer, Vec<PipelineDescriptor>>>,
}

impl PipelineRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pipeline, replacing any existing entry with the same key.
    ///
    /// A replaced entry keeps its position in registration order.
    pub fn register(
        &self,
        layer: PipelineLayer,
        name: impl Into<String>,
        runnable: Arc<dyn Runnable>,
        dependencies: Vec<String>,
        metadata: PipelineMetadata,
    ) {
        let descriptor = PipelineDescriptor {
            layer,
            name: name.into(),
            dependencies,
            metadata,
            runnable,
        };
        let full_name = descriptor.full_name();

        let mut layers = self.layers.write();
        let entries = layers.entry(layer).or_default();
        if let Some(existing) = entries.iter_mut().find(|d| d.name == descriptor.name) {
            warn!(pipeline = %full_name, "Pipeline already registered, overwriting");
            *existing = descriptor;
        } else {
            entries.push(descriptor);
        }

        info!(pipeline = %full_name, "Registered pipeline");
    }

    /// Returns the runnable for a pipeline.
    #[must_use]
    pub fn get(&self, layer: PipelineLayer, name: &str) -> Option<Arc<dyn Runnable>> {
        self.descriptor(layer, name).map(|d| d.runnable)
    }

    /// Returns the full descriptor for a pipeline.
    #[must_use]
    pub fn descriptor(&self, layer: PipelineLayer, name: &str) -> Option<PipelineDescriptor> {
        self.layers
            .read()
            .get(&layer)
            .and_then(|entries| entries.iter().find(|d| d.name == name))
            .cloned()
    }

    /// Lists descriptors in registration order.
    ///
    /// Without a filter, layers come bronze, silver, gold.
    #[must_use]
    pub fn list(&self, layer: Option<PipelineLayer>) -> Vec<PipelineDescriptor> {
        let layers = self.layers.read();
        match layer {
            Some(layer) => layers.get(&layer).cloned().unwrap_or_default(),
            None => layers.values().flatten().cloned().collect(),
        }
    }

    /// Lists pipelines as serializable info entries.
    #[must_use]
    pub fn list_info(&self, layer: Option<PipelineLayer>) -> Vec<PipelineInfo> {
        self.list(layer).iter().map(PipelineDescriptor::info).collect()
    }

    /// Returns the declared dependencies, empty when the pipeline is unknown.
    #[must_use]
    pub fn get_dependencies(&self, layer: PipelineLayer, name: &str) -> Vec<String> {
        self.layers
            .read()
            .get(&layer)
            .and_then(|entries| entries.iter().find(|d| d.name == name))
            .map(|d| d.dependencies.clone())
            .unwrap_or_default()
    }

    /// Returns the number of pipelines registered in a layer.
    #[must_use]
    pub fn count(&self, layer: PipelineLayer) -> usize {
        self.layers.read().get(&layer).map_or(0, Vec::len)
    }

    /// Returns the total number of registered pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.read().values().map(Vec::len).sum()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the referenced pipeline is registered.
    #[must_use]
    pub fn contains(&self, pipeline: &PipelineRef) -> bool {
        self.layers
            .read()
            .get(&pipeline.layer)
            .is_some_and(|entries| entries.iter().any(|d| d.name == pipeline.name))
    }

    /// Returns the pipeline names of a layer in registration order.
    #[must_use]
    pub fn names(&self, layer: PipelineLayer) -> Vec<String> {
        self.layers
            .read()
            .get(&layer)
            .map(|entries| entries.iter().map(|d| d.name.clone()).collect())
            .unwrap_or_default()
    }
}
