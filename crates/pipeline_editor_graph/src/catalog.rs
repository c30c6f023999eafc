// SPDX-License-Identifier: MIT OR Apache-2.0
//! Catalog records that node configurations are chosen from.
//!
//! Fetching catalogs is somebody else's job; the editor only reads the
//! records through [`CatalogProvider`].

use crate::config::HyperparameterValue;
use crate::node::NodeKind;
use serde::{Deserialize, Serialize};

/// A tunable parameter exposed by a catalog version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSpec {
    /// Parameter name
    pub name: String,
    /// Value used until the user changes it
    pub default: HyperparameterValue,
    /// Help text
    #[serde(default)]
    pub description: String,
}

/// One published version of a catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogVersion {
    /// Version label
    pub version: String,
    /// Task identifiers this version supports
    #[serde(default)]
    pub tasks: Vec<String>,
    /// Tunable parameters
    #[serde(default)]
    pub hyperparameters: Vec<HyperparameterSpec>,
    /// File slots a dataset version expects to be mapped
    #[serde(default)]
    pub files: Vec<String>,
}

/// A dataset, processor, model or metric offered by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Published versions, oldest first
    #[serde(default)]
    pub versions: Vec<CatalogVersion>,
}

impl CatalogRecord {
    /// Look up a version by label
    pub fn version(&self, version: &str) -> Option<&CatalogVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// Most recently published version
    pub fn latest(&self) -> Option<&CatalogVersion> {
        self.versions.last()
    }
}

/// Source of catalog records per node kind
pub trait CatalogProvider {
    /// All records offered for a kind
    fn records(&self, kind: NodeKind) -> &[CatalogRecord];

    /// Look up a record by id
    fn record(&self, kind: NodeKind, id: &str) -> Option<&CatalogRecord> {
        self.records(kind).iter().find(|r| r.id == id)
    }
}

/// Error loading a catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// RON parse failure
    #[error("Invalid catalog: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// In-memory catalog, typically loaded from a RON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticCatalog {
    /// Dataset records
    #[serde(default)]
    pub datasets: Vec<CatalogRecord>,
    /// Processor records
    #[serde(default)]
    pub processors: Vec<CatalogRecord>,
    /// Model records
    #[serde(default)]
    pub models: Vec<CatalogRecord>,
    /// Metric records
    #[serde(default)]
    pub metrics: Vec<CatalogRecord>,
}

impl StaticCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from RON text
    pub fn from_ron(text: &str) -> Result<Self, CatalogError> {
        Ok(ron::from_str(text)?)
    }

    /// Add a record under a kind
    pub fn insert(&mut self, kind: NodeKind, record: CatalogRecord) {
        self.records_mut(kind).push(record);
    }

    /// Total number of records across all kinds
    pub fn len(&self) -> usize {
        NodeKind::ALL.iter().map(|k| self.records(*k).len()).sum()
    }

    /// Whether the catalog has no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records_mut(&mut self, kind: NodeKind) -> &mut Vec<CatalogRecord> {
        match kind {
            NodeKind::Dataset => &mut self.datasets,
            NodeKind::Processor => &mut self.processors,
            NodeKind::Model => &mut self.models,
            NodeKind::Metric => &mut self.metrics,
        }
    }
}

impl CatalogProvider for StaticCatalog {
    fn records(&self, kind: NodeKind) -> &[CatalogRecord] {
        match kind {
            NodeKind::Dataset => &self.datasets,
            NodeKind::Processor => &self.processors,
            NodeKind::Model => &self.models,
            NodeKind::Metric => &self.metrics,
        }
    }
}
