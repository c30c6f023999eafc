// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph editing core for the ML pipeline editor.
//!
//! Users place pipeline stages (datasets, processors, models, metrics) on a
//! pannable, zoomable canvas and wire them together.
//!
//! ## Architecture
//!
//! - [`Graph`] owns nodes and edges and enforces cascading delete and
//!   duplicate-free edges
//! - [`validation`] decides which stage kinds may feed which
//! - [`ViewportTransform`] maps canvas space to screen space
//! - [`InteractionController`] is the single input state machine
//! - [`PipelineCanvas`] adapts egui input and paints the result
//! - [`ConfigurationDraft`] edits a node's catalog selection before commit

pub mod catalog;
pub mod config;
pub mod edge;
pub mod export;
pub mod graph;
pub mod interaction;
pub mod node;
pub mod port;
pub mod routing;
pub mod ui;
pub mod validation;
pub mod viewport;

pub use catalog::{CatalogProvider, CatalogRecord, CatalogVersion, StaticCatalog};
pub use config::{ConfigError, ConfigurationDraft, HyperparameterValue, NodeConfiguration};
pub use edge::{Edge, EdgeId, Endpoint};
pub use export::PipelineSnapshot;
pub use graph::{Graph, GraphError};
pub use interaction::{CanvasEvent, Feedback, InteractionController, InteractionSettings};
pub use node::{Node, NodeId, NodeKind};
pub use port::{Port, PortDirection, PortId};
pub use routing::EdgePath;
pub use ui::PipelineCanvas;
pub use validation::{ConnectionError, PortRef};
pub use viewport::{ViewportTransform, ZoomDirection};
