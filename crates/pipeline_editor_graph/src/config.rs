// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node configuration payloads and the draft used to build them.

use crate::catalog::{CatalogProvider, CatalogRecord, CatalogVersion};
use crate::node::{Node, NodeKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a single hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HyperparameterValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Free text
    Text(String),
}

impl HyperparameterValue {
    /// Parse `text` as a value of the same variant as `self`
    pub fn parse_as(&self, text: &str) -> Option<Self> {
        let text = text.trim();
        match self {
            Self::Bool(_) => text.parse().ok().map(Self::Bool),
            Self::Int(_) => text.parse().ok().map(Self::Int),
            Self::Float(_) => text.parse().ok().map(Self::Float),
            Self::Text(_) => Some(Self::Text(text.to_string())),
        }
    }

    fn same_variant(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for HyperparameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Ordered hyperparameter values by name
pub type Hyperparameters = IndexMap<String, HyperparameterValue>;

/// Committed dataset selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Catalog record id
    pub dataset_id: String,
    /// Catalog version
    pub version: String,
    /// Task the dataset is used for
    pub task: Option<String>,
    /// File slot -> file path
    pub file_mappings: IndexMap<String, String>,
}

/// Committed processor selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Catalog record id
    pub processor_id: String,
    /// Catalog version
    pub version: String,
    /// Parameter values
    pub hyperparameters: Hyperparameters,
}

/// Committed model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Catalog record id
    pub model_id: String,
    /// Catalog version
    pub version: String,
    /// Task the model is trained for
    pub task: Option<String>,
    /// Parameter values
    pub hyperparameters: Hyperparameters,
}

/// Committed metric selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Catalog record id
    pub metric_id: String,
    /// Catalog version
    pub version: String,
    /// Parameter values
    pub hyperparameters: Hyperparameters,
}

/// Kind-specific configuration carried by a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum NodeConfiguration {
    /// Nothing committed yet
    #[default]
    Unconfigured,
    /// Dataset stage
    Dataset(DatasetConfig),
    /// Processor stage
    Processor(ProcessorConfig),
    /// Model stage
    Model(ModelConfig),
    /// Metric stage
    Metric(MetricConfig),
}

impl NodeConfiguration {
    /// The node kind this payload belongs to, if any
    pub fn kind(&self) -> Option<NodeKind> {
        match self {
            Self::Unconfigured => None,
            Self::Dataset(_) => Some(NodeKind::Dataset),
            Self::Processor(_) => Some(NodeKind::Processor),
            Self::Model(_) => Some(NodeKind::Model),
            Self::Metric(_) => Some(NodeKind::Metric),
        }
    }

    /// Whether this payload may be stored on a node of `kind`
    pub fn fits(&self, kind: NodeKind) -> bool {
        self.kind().map_or(true, |k| k == kind)
    }

    /// Catalog record id and version, if configured
    pub fn selection(&self) -> Option<(&str, &str)> {
        match self {
            Self::Unconfigured => None,
            Self::Dataset(c) => Some((&c.dataset_id, &c.version)),
            Self::Processor(c) => Some((&c.processor_id, &c.version)),
            Self::Model(c) => Some((&c.model_id, &c.version)),
            Self::Metric(c) => Some((&c.metric_id, &c.version)),
        }
    }
}

/// Error committing a configuration draft
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No record or version was chosen
    #[error("Select a {kind} and a version before saving")]
    MissingSelection {
        /// Kind being configured
        kind: NodeKind,
    },

    /// Chosen record is not in the catalog
    #[error("Unknown {kind} '{id}'")]
    UnknownRecord {
        /// Kind being configured
        kind: NodeKind,
        /// Record id that did not resolve
        id: String,
    },

    /// Chosen version is not published for the record
    #[error("'{id}' has no version '{version}'")]
    UnknownVersion {
        /// Record id
        id: String,
        /// Version label that did not resolve
        version: String,
    },
}

/// Form state for configuring one node
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationDraft {
    /// Kind being configured
    pub kind: NodeKind,
    /// Chosen catalog record
    pub record_id: Option<String>,
    /// Chosen version of that record
    pub version: Option<String>,
    /// Chosen task
    pub task: Option<String>,
    /// Parameter values
    pub hyperparameters: Hyperparameters,
    /// File slot -> path (datasets only)
    pub file_mappings: IndexMap<String, String>,
}

impl ConfigurationDraft {
    /// Empty draft for a kind
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            record_id: None,
            version: None,
            task: None,
            hyperparameters: Hyperparameters::new(),
            file_mappings: IndexMap::new(),
        }
    }

    /// Draft prefilled from a node's committed configuration
    pub fn from_node(node: &Node) -> Self {
        let mut draft = Self::new(node.kind);
        if let Some((id, version)) = node.configuration.selection() {
            draft.record_id = Some(id.to_string());
            draft.version = Some(version.to_string());
        }
        match &node.configuration {
            NodeConfiguration::Unconfigured => {}
            NodeConfiguration::Dataset(c) => {
                draft.task = c.task.clone();
                draft.file_mappings = c.file_mappings.clone();
            }
            NodeConfiguration::Processor(c) => draft.hyperparameters = c.hyperparameters.clone(),
            NodeConfiguration::Model(c) => {
                draft.task = c.task.clone();
                draft.hyperparameters = c.hyperparameters.clone();
            }
            NodeConfiguration::Metric(c) => draft.hyperparameters = c.hyperparameters.clone(),
        }
        draft
    }

    /// Choose a record; clears everything that depended on the old one
    pub fn select_record(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.record_id.as_deref() == Some(id.as_str()) {
            return;
        }
        self.record_id = Some(id);
        self.version = None;
        self.task = None;
        self.hyperparameters.clear();
        self.file_mappings.clear();
    }

    /// Choose a version and seed its defaults from the catalog
    pub fn select_version(
        &mut self,
        version: impl Into<String>,
        catalog: &dyn CatalogProvider,
    ) -> Result<(), ConfigError> {
        self.version = Some(version.into());
        self.seed(catalog)
    }

    /// Align hyperparameters, file slots and task with the chosen version.
    ///
    /// Values the user already entered are kept when the version still
    /// declares a parameter of the same type.
    pub fn seed(&mut self, catalog: &dyn CatalogProvider) -> Result<(), ConfigError> {
        let (_, version) = self.resolve(catalog)?;

        let mut hyperparameters = Hyperparameters::new();
        for spec in &version.hyperparameters {
            let value = match self.hyperparameters.get(&spec.name) {
                Some(existing) if existing.same_variant(&spec.default) => existing.clone(),
                _ => spec.default.clone(),
            };
            hyperparameters.insert(spec.name.clone(), value);
        }
        self.hyperparameters = hyperparameters;

        let mut file_mappings = IndexMap::new();
        for slot in &version.files {
            let path = self.file_mappings.get(slot).cloned().unwrap_or_default();
            file_mappings.insert(slot.clone(), path);
        }
        self.file_mappings = file_mappings;

        let task_supported = self
            .task
            .as_ref()
            .is_some_and(|t| version.tasks.contains(t));
        if !task_supported {
            self.task = version.tasks.first().cloned();
        }

        Ok(())
    }

    /// Build the payload and display title
    pub fn commit(
        &self,
        catalog: &dyn CatalogProvider,
    ) -> Result<(NodeConfiguration, String), ConfigError> {
        let (record, version) = self.resolve(catalog)?;
        let id = record.id.clone();
        let version = version.version.clone();
        let hyperparameters = self.hyperparameters.clone();

        let configuration = match self.kind {
            NodeKind::Dataset => NodeConfiguration::Dataset(DatasetConfig {
                dataset_id: id,
                version,
                task: self.task.clone(),
                file_mappings: self.file_mappings.clone(),
            }),
            NodeKind::Processor => NodeConfiguration::Processor(ProcessorConfig {
                processor_id: id,
                version,
                hyperparameters,
            }),
            NodeKind::Model => NodeConfiguration::Model(ModelConfig {
                model_id: id,
                version,
                task: self.task.clone(),
                hyperparameters,
            }),
            NodeKind::Metric => NodeConfiguration::Metric(MetricConfig {
                metric_id: id,
                version,
                hyperparameters,
            }),
        };

        Ok((configuration, record.name.clone()))
    }

    fn resolve<'c>(
        &self,
        catalog: &'c dyn CatalogProvider,
    ) -> Result<(&'c CatalogRecord, &'c CatalogVersion), ConfigError> {
        let missing = ConfigError::MissingSelection { kind: self.kind };
        let id = self.record_id.as_deref().filter(|s| !s.is_empty()).ok_or(missing.clone())?;
        let version = self.version.as_deref().filter(|s| !s.is_empty()).ok_or(missing)?;

        let record = catalog
            .record(self.kind, id)
            .ok_or_else(|| ConfigError::UnknownRecord {
                kind: self.kind,
                id: id.to_string(),
            })?;
        let found = record
            .version(version)
            .ok_or_else(|| ConfigError::UnknownVersion {
                id: id.to_string(),
                version: version.to_string(),
            })?;

        Ok((record, found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{HyperparameterSpec, StaticCatalog};
    use egui::Pos2;

    fn catalog() -> StaticCatalog {
        let mut catalog = StaticCatalog::new();
        catalog.insert(
            NodeKind::Model,
            CatalogRecord {
                id: "resnet".into(),
                name: "ResNet-50".into(),
                versions: vec![
                    CatalogVersion {
                        version: "v1".into(),
                        tasks: vec!["classification".into()],
                        hyperparameters: vec![
                            HyperparameterSpec {
                                name: "lr".into(),
                                default: HyperparameterValue::Float(0.1),
                                description: String::new(),
                            },
                            HyperparameterSpec {
                                name: "epochs".into(),
                                default: HyperparameterValue::Int(10),
                                description: String::new(),
                            },
                        ],
                        files: Vec::new(),
                    },
                    CatalogVersion {
                        version: "v2".into(),
                        tasks: vec!["detection".into()],
                        hyperparameters: vec![HyperparameterSpec {
                            name: "lr".into(),
                            default: HyperparameterValue::Float(0.01),
                            description: String::new(),
                        }],
                        files: Vec::new(),
                    },
                ],
            },
        );
        catalog.insert(
            NodeKind::Dataset,
            CatalogRecord {
                id: "mnist".into(),
                name: "MNIST".into(),
                versions: vec![CatalogVersion {
                    version: "3.0".into(),
                    tasks: vec!["classification".into()],
                    hyperparameters: Vec::new(),
                    files: vec!["train".into(), "test".into()],
                }],
            },
        );
        catalog
    }

    #[test]
    fn test_missing_selection() {
        let catalog = catalog();
        let mut draft = ConfigurationDraft::new(NodeKind::Model);
        assert_eq!(
            draft.commit(&catalog),
            Err(ConfigError::MissingSelection { kind: NodeKind::Model })
        );

        draft.select_record("resnet");
        assert_eq!(
            draft.commit(&catalog),
            Err(ConfigError::MissingSelection { kind: NodeKind::Model })
        );
    }

    #[test]
    fn test_unknown_record_and_version() {
        let catalog = catalog();
        let mut draft = ConfigurationDraft::new(NodeKind::Model);
        draft.select_record("vgg");
        assert!(matches!(
            draft.select_version("v1", &catalog),
            Err(ConfigError::UnknownRecord { .. })
        ));

        draft.select_record("resnet");
        assert!(matches!(
            draft.select_version("v9", &catalog),
            Err(ConfigError::UnknownVersion { .. })
        ));
    }

    #[test]
    fn test_seed_defaults_and_commit() {
        let catalog = catalog();
        let mut draft = ConfigurationDraft::new(NodeKind::Model);
        draft.select_record("resnet");
        draft.select_version("v1", &catalog).unwrap();

        assert_eq!(draft.task.as_deref(), Some("classification"));
        assert_eq!(draft.hyperparameters["lr"], HyperparameterValue::Float(0.1));

        draft.hyperparameters.insert("epochs".into(), HyperparameterValue::Int(5));
        let (configuration, title) = draft.commit(&catalog).unwrap();
        assert_eq!(title, "ResNet-50");
        match configuration {
            NodeConfiguration::Model(model) => {
                assert_eq!(model.model_id, "resnet");
                assert_eq!(model.version, "v1");
                assert_eq!(model.hyperparameters["epochs"], HyperparameterValue::Int(5));
            }
            other => panic!("unexpected configuration {other:?}"),
        }
    }

    #[test]
    fn test_version_switch_keeps_compatible_values() {
        let catalog = catalog();
        let mut draft = ConfigurationDraft::new(NodeKind::Model);
        draft.select_record("resnet");
        draft.select_version("v1", &catalog).unwrap();
        draft.hyperparameters.insert("lr".into(), HyperparameterValue::Float(0.5));

        draft.select_version("v2", &catalog).unwrap();
        assert_eq!(draft.hyperparameters.len(), 1);
        assert_eq!(draft.hyperparameters["lr"], HyperparameterValue::Float(0.5));
        assert_eq!(draft.task.as_deref(), Some("detection"));
    }

    #[test]
    fn test_dataset_file_slots() {
        let catalog = catalog();
        let mut draft = ConfigurationDraft::new(NodeKind::Dataset);
        draft.select_record("mnist");
        draft.select_version("3.0", &catalog).unwrap();
        assert_eq!(draft.file_mappings.keys().collect::<Vec<_>>(), ["train", "test"]);

        draft.file_mappings.insert("train".into(), "data/train.csv".into());
        let (configuration, _) = draft.commit(&catalog).unwrap();
        let NodeConfiguration::Dataset(dataset) = configuration else {
            panic!("expected dataset configuration");
        };
        assert_eq!(dataset.file_mappings["train"], "data/train.csv");
    }

    #[test]
    fn test_draft_round_trips_through_node() {
        let catalog = catalog();
        let mut draft = ConfigurationDraft::new(NodeKind::Model);
        draft.select_record("resnet");
        draft.select_version("v1", &catalog).unwrap();
        let (configuration, _) = draft.commit(&catalog).unwrap();

        let mut node = Node::new(NodeKind::Model, Pos2::ZERO);
        node.configuration = configuration;
        assert_eq!(ConfigurationDraft::from_node(&node), draft);
    }

    #[test]
    fn test_payload_fits_kind() {
        assert!(NodeConfiguration::Unconfigured.fits(NodeKind::Metric));
        let metric = NodeConfiguration::Metric(MetricConfig {
            metric_id: "f1".into(),
            version: "1".into(),
            hyperparameters: Hyperparameters::new(),
        });
        assert!(metric.fits(NodeKind::Metric));
        assert!(!metric.fits(NodeKind::Model));
    }

    #[test]
    fn test_parse_as_keeps_variant() {
        let float = HyperparameterValue::Float(1.0);
        assert_eq!(float.parse_as(" 0.25 "), Some(HyperparameterValue::Float(0.25)));
        assert_eq!(float.parse_as("fast"), None);
        assert_eq!(
            HyperparameterValue::Bool(false).parse_as("true"),
            Some(HyperparameterValue::Bool(true))
        );
    }
}
