// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the pipeline graph.

use crate::config::NodeConfiguration;
use crate::port::{Port, PortDirection, PortId};
use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Node body width (canvas units)
pub const NODE_WIDTH: f32 = 180.0;
/// Height of the title header
pub const NODE_HEADER_HEIGHT: f32 = 24.0;
/// Height of one port row
pub const PORT_ROW_HEIGHT: f32 = 22.0;
/// Padding below the last port row
const NODE_FOOTER_HEIGHT: f32 = 8.0;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// Data source
    Dataset,
    /// Transformation step
    Processor,
    /// Trainable or pretrained model
    Model,
    /// Evaluation metric (sink)
    Metric,
}

/// Port declaration in a kind template
struct PortTemplate {
    name: &'static str,
    direction: PortDirection,
}

const fn input(name: &'static str) -> PortTemplate {
    PortTemplate { name, direction: PortDirection::Input }
}

const fn output(name: &'static str) -> PortTemplate {
    PortTemplate { name, direction: PortDirection::Output }
}

impl NodeKind {
    /// Every kind, in palette order
    pub const ALL: [NodeKind; 4] = [Self::Dataset, Self::Processor, Self::Model, Self::Metric];

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Dataset => "Dataset",
            Self::Processor => "Processor",
            Self::Model => "Model",
            Self::Metric => "Metric",
        }
    }

    /// Header color for this kind (for UI)
    pub fn color(self) -> [u8; 3] {
        match self {
            Self::Dataset => [70, 130, 100],
            Self::Processor => [130, 110, 60],
            Self::Model => [70, 100, 150],
            Self::Metric => [140, 70, 110],
        }
    }

    fn template(self) -> &'static [PortTemplate] {
        const DATASET: &[PortTemplate] = &[output("data")];
        const PROCESSOR: &[PortTemplate] = &[input("input"), output("output")];
        const MODEL: &[PortTemplate] = &[input("data"), output("predictions")];
        const METRIC: &[PortTemplate] = &[input("predictions")];

        match self {
            Self::Dataset => DATASET,
            Self::Processor => PROCESSOR,
            Self::Model => MODEL,
            Self::Metric => METRIC,
        }
    }

    /// Instantiate the fixed port set for this kind.
    ///
    /// Inputs sit on the left edge, outputs on the right edge, one row each.
    pub fn instantiate_ports(self) -> (Vec<Port>, Vec<Port>) {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();

        for (index, template) in self.template().iter().enumerate() {
            let id = PortId(index as u32);
            match template.direction {
                PortDirection::Input => {
                    let offset = Vec2::new(0.0, row_center(inputs.len()));
                    inputs.push(Port::new(id, template.name, PortDirection::Input, offset));
                }
                PortDirection::Output => {
                    let offset = Vec2::new(NODE_WIDTH, row_center(outputs.len()));
                    outputs.push(Port::new(id, template.name, PortDirection::Output, offset));
                }
            }
        }

        (inputs, outputs)
    }

    /// Body size derived from the template
    pub fn size(self) -> Vec2 {
        let (inputs, outputs) = self
            .template()
            .iter()
            .fold((0usize, 0usize), |(i, o), t| match t.direction {
                PortDirection::Input => (i + 1, o),
                PortDirection::Output => (i, o + 1),
            });
        let rows = inputs.max(outputs);
        Vec2::new(
            NODE_WIDTH,
            NODE_HEADER_HEIGHT + rows as f32 * PORT_ROW_HEIGHT + NODE_FOOTER_HEIGHT,
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn row_center(row: usize) -> f32 {
    NODE_HEADER_HEIGHT + row as f32 * PORT_ROW_HEIGHT + PORT_ROW_HEIGHT / 2.0
}

/// A node instance in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Stage kind (fixes the port set)
    pub kind: NodeKind,
    /// Top-left corner in canvas space
    pub position: Pos2,
    /// Body size in canvas units
    pub size: Vec2,
    /// Display title
    pub title: String,
    /// Kind-specific configuration
    pub configuration: NodeConfiguration,
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Whether the node is selected in the editor
    pub selected: bool,
}

impl Node {
    /// Create a node of the given kind at a canvas position
    pub fn new(kind: NodeKind, position: Pos2) -> Self {
        let (inputs, outputs) = kind.instantiate_ports();
        let mut node = Self {
            id: NodeId::new(),
            kind,
            position,
            size: kind.size(),
            title: kind.name().to_string(),
            configuration: NodeConfiguration::Unconfigured,
            inputs,
            outputs,
            selected: false,
        };
        node.place_ports();
        node
    }

    /// Recompute every port position from the node's current position
    pub fn place_ports(&mut self) {
        let origin = self.position;
        for port in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            port.place(origin);
        }
    }

    /// Body rectangle in canvas space
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position, self.size)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        self.ports().find(|p| p.id == port_id)
    }

    /// Get all ports, inputs first
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Whether the configuration has been committed
    pub fn is_configured(&self) -> bool {
        !matches!(self.configuration, NodeConfiguration::Unconfigured)
    }
}
