// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plain data handed to an export serializer.

use crate::config::NodeConfiguration;
use crate::node::{NodeId, NodeKind};
use serde::{Deserialize, Serialize};

/// One node as seen by an exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Node ID
    pub id: NodeId,
    /// Stage kind
    pub kind: NodeKind,
    /// Display title
    pub title: String,
    /// Canvas position
    pub position: [f32; 2],
    /// Committed configuration
    pub configuration: NodeConfiguration,
}

/// One edge as seen by an exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    /// Node on the output side
    pub source_node: NodeId,
    /// Output port name
    pub source_port: String,
    /// Node on the input side
    pub target_node: NodeId,
    /// Input port name
    pub target_port: String,
}

/// Node and edge lists of a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    /// Nodes in creation order
    pub nodes: Vec<SnapshotNode>,
    /// Edges in creation order
    pub edges: Vec<SnapshotEdge>,
}

impl PipelineSnapshot {
    /// Nodes that have not been configured yet
    pub fn unconfigured(&self) -> impl Iterator<Item = &SnapshotNode> {
        self.nodes
            .iter()
            .filter(|n| n.configuration == NodeConfiguration::Unconfigured)
    }

    /// Whether nothing has been placed
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
