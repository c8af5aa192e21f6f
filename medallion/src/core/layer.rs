//! Pipeline layers and `layer.name` references.

use crate::errors::MedallionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Data layer a pipeline writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineLayer {
    /// Raw ingestion.
    Bronze,
    /// Cleaned, conformed tables.
    Silver,
    /// Curated business aggregates.
    Gold,
}

impl PipelineLayer {
    /// All layers in execution order.
    pub const ALL: [Self; 3] = [Self::Bronze, Self::Silver, Self::Gold];

    /// Returns the lowercase layer name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
        }
    }
}

impl fmt::Display for PipelineLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineLayer {
    type Err = MedallionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            other => Err(MedallionError::InvalidReference(other.to_string())),
        }
    }
}

/// A `(layer, name)` pair identifying a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PipelineRef {
    /// The layer.
    pub layer: PipelineLayer,
    /// The pipeline name, unique within its layer.
    pub name: String,
}

impl PipelineRef {
    /// Creates a new reference.
    #[must_use]
    pub fn new(layer: PipelineLayer, name: impl Into<String>) -> Self {
        Self {
            layer,
            name: name.into(),
        }
    }

    /// Parses `"layer.name"`, splitting on the first `.`.
    ///
    /// # Errors
    ///
    /// Returns [`MedallionError::InvalidReference`] when there is no `.`,
    /// the name is empty, or the layer is unknown.
    pub fn parse(reference: &str) -> Result<Self, MedallionError> {
        let invalid = || MedallionError::InvalidReference(reference.to_string());
        let (layer, name) = reference.split_once('.').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }
        let layer = layer.parse::<PipelineLayer>().map_err(|_| invalid())?;
        Ok(Self::new(layer, name))
    }

    /// Returns the `layer.name` form.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PipelineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.layer, self.name)
    }
}

impl FromStr for PipelineRef {
    type Err = MedallionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
