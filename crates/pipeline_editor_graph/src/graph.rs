// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and edges.
//!
//! Every edge endpoint resolves to a live node and one of its ports for the
//! whole life of the edge: edges are only inserted after both endpoints
//! resolve, and deleting a node removes its edges in the same call.

use crate::config::NodeConfiguration;
use crate::edge::{Edge, EdgeId, Endpoint};
use crate::export::{PipelineSnapshot, SnapshotEdge, SnapshotNode};
use crate::node::{Node, NodeId, NodeKind};
use crate::port::PortId;
use crate::validation::{self, ConnectionError, PortRef};
use egui::Pos2;
use indexmap::IndexMap;
use serde::Serialize;

/// A pipeline graph
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    /// Nodes in creation order
    nodes: IndexMap<NodeId, Node>,
    /// Edges in creation order
    edges: IndexMap<EdgeId, Edge>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node of `kind` with its template ports at `position`
    pub fn create_node(&mut self, kind: NodeKind, position: Pos2) -> NodeId {
        let node = Node::new(kind, position);
        let id = node.id;
        tracing::debug!(%id, %kind, x = position.x, y = position.y, "node created");
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every edge touching it
    pub fn delete_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(&node_id)?;
        let before = self.edges.len();
        self.edges.retain(|_, e| !e.involves_node(node_id));
        tracing::debug!(
            id = %node_id,
            edges_removed = before - self.edges.len(),
            "node deleted"
        );
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get all nodes, oldest first
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Resolve an endpoint into what the connection rules need
    pub fn port_ref(&self, endpoint: Endpoint) -> Result<PortRef, GraphError> {
        let node = self
            .nodes
            .get(&endpoint.node)
            .ok_or(GraphError::NodeNotFound(endpoint.node))?;
        let port = node.port(endpoint.port).ok_or(GraphError::PortNotFound {
            node: endpoint.node,
            port: endpoint.port,
        })?;
        Ok(PortRef {
            node: node.id,
            kind: node.kind,
            port: port.id,
            direction: port.direction,
        })
    }

    /// Add an edge from an output port to an input port.
    ///
    /// Creating an edge that already exists returns the existing id and
    /// leaves the graph unchanged.
    pub fn create_edge(
        &mut self,
        source: Endpoint,
        target: Endpoint,
    ) -> Result<EdgeId, GraphError> {
        let first = self.port_ref(source)?;
        let second = self.port_ref(target)?;
        let valid = validation::validate(first, second)?;
        let source = Endpoint::new(valid.source.node, valid.source.port);
        let target = Endpoint::new(valid.target.node, valid.target.port);

        if let Some(existing) = self.find_edge(source, target) {
            tracing::debug!(id = ?existing, "edge already present");
            return Ok(existing);
        }

        let edge = Edge::new(source, target);
        let id = edge.id;
        tracing::debug!(
            ?id,
            from = %valid.source.kind,
            to = %valid.target.kind,
            "edge created"
        );
        self.edges.insert(id, edge);
        Ok(id)
    }

    /// Edge running from `source` to `target`, if one exists
    pub fn find_edge(&self, source: Endpoint, target: Endpoint) -> Option<EdgeId> {
        self.edges
            .values()
            .find(|e| e.joins(source, target))
            .map(|e| e.id)
    }

    /// Remove an edge
    pub fn delete_edge(&mut self, edge_id: EdgeId) -> Option<Edge> {
        self.edges.shift_remove(&edge_id)
    }

    /// Get an edge by ID
    pub fn edge(&self, edge_id: EdgeId) -> Option<&Edge> {
        self.edges.get(&edge_id)
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Get edges touching a node
    pub fn edges_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(move |e| e.involves_node(node_id))
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Commit a configuration payload and display title to a node
    pub fn set_node_configuration(
        &mut self,
        node_id: NodeId,
        configuration: NodeConfiguration,
        title: impl Into<String>,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        if !configuration.fits(node.kind) {
            return Err(GraphError::ConfigurationKindMismatch { node: node.kind });
        }
        node.configuration = configuration;
        node.title = title.into();
        tracing::debug!(id = %node_id, title = %node.title, "node configured");
        Ok(())
    }

    /// Move a node and re-place its ports
    pub fn move_node(&mut self, node_id: NodeId, position: Pos2) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.position = position;
        node.place_ports();
        Ok(())
    }

    /// Recompute every port position from its owner's position
    pub fn refresh_port_positions(&mut self) {
        for node in self.nodes.values_mut() {
            node.place_ports();
        }
    }

    /// Canvas position of a port
    pub fn port_position(&self, endpoint: Endpoint) -> Option<Pos2> {
        self.node(endpoint.node)?.port(endpoint.port).map(|p| p.position)
    }

    /// Select exactly one node
    pub fn select_only(&mut self, node_id: NodeId) {
        for node in self.nodes.values_mut() {
            node.selected = node.id == node_id;
        }
    }

    /// Deselect every node
    pub fn clear_selection(&mut self) {
        for node in self.nodes.values_mut() {
            node.selected = false;
        }
    }

    /// IDs of selected nodes
    pub fn selected_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.values().filter(|n| n.selected).map(|n| n.id)
    }

    /// Delete every selected node (with cascade); returns the removed nodes
    pub fn delete_selected(&mut self) -> Vec<Node> {
        let selected: Vec<_> = self.selected_nodes().collect();
        selected
            .into_iter()
            .filter_map(|id| self.delete_node(id))
            .collect()
    }

    /// Plain data view for an export serializer
    pub fn snapshot(&self) -> PipelineSnapshot {
        let nodes = self
            .nodes
            .values()
            .map(|n| SnapshotNode {
                id: n.id,
                kind: n.kind,
                title: n.title.clone(),
                position: [n.position.x, n.position.y],
                configuration: n.configuration.clone(),
            })
            .collect();

        let port_name = |endpoint: Endpoint| {
            self.node(endpoint.node)
                .and_then(|n| n.port(endpoint.port))
                .map(|p| p.name.clone())
                .unwrap_or_default()
        };
        let edges = self
            .edges
            .values()
            .map(|e| SnapshotEdge {
                source_node: e.source.node,
                source_port: port_name(e.source),
                target_node: e.target.node,
                target_port: port_name(e.target),
            })
            .collect();

        PipelineSnapshot { nodes, edges }
    }
}

/// Error mutating the graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found on the node
    #[error("Port {port} not found on node {node}")]
    PortNotFound {
        /// Node that was searched
        node: NodeId,
        /// Missing port
        port: PortId,
    },

    /// Connection rules refused the edge
    #[error(transparent)]
    InvalidConnection(#[from] ConnectionError),

    /// Payload variant does not belong to the node's kind
    #[error("Configuration does not match a {node} node")]
    ConfigurationKindMismatch {
        /// Kind of the node being configured
        node: NodeKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricConfig;
    use proptest::prelude::*;

    fn output_of(graph: &Graph, id: NodeId) -> Endpoint {
        Endpoint::new(id, graph.node(id).unwrap().outputs[0].id)
    }

    fn input_of(graph: &Graph, id: NodeId) -> Endpoint {
        Endpoint::new(id, graph.node(id).unwrap().inputs[0].id)
    }

    fn assert_no_dangling(graph: &Graph) {
        for edge in graph.edges() {
            for endpoint in [edge.source, edge.target] {
                assert!(graph.port_ref(endpoint).is_ok(), "dangling {endpoint:?}");
            }
        }
    }

    #[test]
    fn test_dataset_model_scenario() {
        let mut graph = Graph::new();
        let dataset = graph.create_node(NodeKind::Dataset, Pos2::new(0.0, 0.0));
        let model = graph.create_node(NodeKind::Model, Pos2::new(300.0, 0.0));

        graph
            .create_edge(output_of(&graph, dataset), input_of(&graph, model))
            .unwrap();
        assert_eq!(graph.edge_count(), 1);

        graph.delete_node(dataset);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node(model).is_some());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_create_edge_is_idempotent() {
        let mut graph = Graph::new();
        let dataset = graph.create_node(NodeKind::Dataset, Pos2::ZERO);
        let processor = graph.create_node(NodeKind::Processor, Pos2::new(250.0, 0.0));

        let a = graph
            .create_edge(output_of(&graph, dataset), input_of(&graph, processor))
            .unwrap();
        let b = graph
            .create_edge(output_of(&graph, dataset), input_of(&graph, processor))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_create_edge_normalizes_direction() {
        let mut graph = Graph::new();
        let dataset = graph.create_node(NodeKind::Dataset, Pos2::ZERO);
        let model = graph.create_node(NodeKind::Model, Pos2::new(250.0, 0.0));

        let forward = graph
            .create_edge(output_of(&graph, dataset), input_of(&graph, model))
            .unwrap();
        let backward = graph
            .create_edge(input_of(&graph, model), output_of(&graph, dataset))
            .unwrap();
        assert_eq!(forward, backward);

        let edge = graph.edge(forward).unwrap();
        assert_eq!(edge.source.node, dataset);
        assert_eq!(edge.target.node, model);
    }

    #[test]
    fn test_create_edge_rejects_unresolved() {
        let mut graph = Graph::new();
        let dataset = graph.create_node(NodeKind::Dataset, Pos2::ZERO);
        let ghost = Endpoint::new(NodeId::new(), PortId(0));

        assert_eq!(
            graph.create_edge(output_of(&graph, dataset), ghost),
            Err(GraphError::NodeNotFound(ghost.node))
        );
        assert!(matches!(
            graph.create_edge(output_of(&graph, dataset), Endpoint::new(dataset, PortId(7))),
            Err(GraphError::PortNotFound { .. })
        ));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_create_edge_rejects_invalid_kinds() {
        let mut graph = Graph::new();
        let dataset = graph.create_node(NodeKind::Dataset, Pos2::ZERO);
        let metric = graph.create_node(NodeKind::Metric, Pos2::new(250.0, 0.0));

        let result = graph.create_edge(output_of(&graph, dataset), input_of(&graph, metric));
        assert!(matches!(
            result,
            Err(GraphError::InvalidConnection(ConnectionError::IncompatibleKinds { .. }))
        ));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_delete_removes_exactly_incident_edges() {
        let mut graph = Graph::new();
        let dataset = graph.create_node(NodeKind::Dataset, Pos2::ZERO);
        let processor = graph.create_node(NodeKind::Processor, Pos2::new(250.0, 0.0));
        let model = graph.create_node(NodeKind::Model, Pos2::new(500.0, 0.0));
        let metric = graph.create_node(NodeKind::Metric, Pos2::new(750.0, 0.0));

        let d_p = graph
            .create_edge(output_of(&graph, dataset), input_of(&graph, processor))
            .unwrap();
        graph
            .create_edge(output_of(&graph, processor), input_of(&graph, model))
            .unwrap();
        let m_x = graph
            .create_edge(output_of(&graph, model), input_of(&graph, metric))
            .unwrap();
        let d_m = graph
            .create_edge(output_of(&graph, dataset), input_of(&graph, model))
            .unwrap();
        assert_eq!(graph.edge_count(), 4);

        graph.delete_node(processor);

        let remaining: Vec<_> = graph.edges().map(|e| e.id).collect();
        assert_eq!(remaining, vec![m_x, d_m]);
        assert!(graph.edge(d_p).is_none());
        assert_no_dangling(&graph);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create(usize),
        Connect(usize, usize),
        Delete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            2 => (0..NodeKind::ALL.len()).prop_map(Op::Create),
            2 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Connect(a, b)),
            1 => any::<usize>().prop_map(Op::Delete),
        ]
    }

    fn apply(graph: &mut Graph, op: Op) {
        let ids: Vec<_> = graph.node_ids().collect();
        match op {
            Op::Create(kind) => {
                let x = graph.node_count() as f32 * 200.0;
                graph.create_node(NodeKind::ALL[kind], Pos2::new(x, 0.0));
            }
            Op::Connect(a, b) if !ids.is_empty() => {
                let a = ids[a % ids.len()];
                let b = ids[b % ids.len()];
                let out = graph.node(a).and_then(|n| n.outputs.first()).map(|p| p.id);
                let inp = graph.node(b).and_then(|n| n.inputs.first()).map(|p| p.id);
                if let (Some(out), Some(inp)) = (out, inp) {
                    let _ = graph.create_edge(Endpoint::new(a, out), Endpoint::new(b, inp));
                }
            }
            Op::Delete(victim) if !ids.is_empty() => {
                graph.delete_node(ids[victim % ids.len()]);
            }
            Op::Connect(..) | Op::Delete(_) => {}
        }
    }

    proptest! {
        #[test]
        fn test_edges_always_resolve(ops in prop::collection::vec(op(), 1..120)) {
            let mut graph = Graph::new();
            for op in ops {
                apply(&mut graph, op);
                assert_no_dangling(&graph);
            }
        }

        #[test]
        fn test_delete_keeps_every_other_edge(
            ops in prop::collection::vec(op(), 1..120),
            victim in any::<usize>(),
        ) {
            let mut graph = Graph::new();
            for op in ops {
                apply(&mut graph, op);
            }
            let ids: Vec<_> = graph.node_ids().collect();
            prop_assume!(!ids.is_empty());
            let victim = ids[victim % ids.len()];

            let expected: Vec<_> = graph
                .edges()
                .filter(|e| !e.involves_node(victim))
                .map(|e| e.id)
                .collect();
            graph.delete_node(victim);

            let remaining: Vec<_> = graph.edges().map(|e| e.id).collect();
            prop_assert_eq!(remaining, expected);
            prop_assert!(graph.node(victim).is_none());
            prop_assert_eq!(graph.node_count(), ids.len() - 1);
        }
    }

    #[test]
    fn test_move_node_replaces_ports() {
        let mut graph = Graph::new();
        let model = graph.create_node(NodeKind::Model, Pos2::ZERO);
        let before = graph.port_position(input_of(&graph, model)).unwrap();

        graph.move_node(model, Pos2::new(40.0, -10.0)).unwrap();
        let after = graph.port_position(input_of(&graph, model)).unwrap();
        assert_eq!(after - before, egui::Vec2::new(40.0, -10.0));
    }

    #[test]
    fn test_refresh_port_positions() {
        let mut graph = Graph::new();
        let a = graph.create_node(NodeKind::Processor, Pos2::ZERO);
        let b = graph.create_node(NodeKind::Metric, Pos2::ZERO);
        for node in graph.nodes.values_mut() {
            node.position += egui::Vec2::new(10.0, 10.0);
        }

        graph.refresh_port_positions();
        for id in [a, b] {
            let node = graph.node(id).unwrap();
            for port in node.ports() {
                assert_eq!(port.position, node.position + port.offset);
            }
        }
    }

    #[test]
    fn test_configuration_kind_mismatch() {
        let mut graph = Graph::new();
        let model = graph.create_node(NodeKind::Model, Pos2::ZERO);
        let metric = NodeConfiguration::Metric(MetricConfig {
            metric_id: "accuracy".into(),
            version: "1".into(),
            hyperparameters: Default::default(),
        });

        assert_eq!(
            graph.set_node_configuration(model, metric.clone(), "Accuracy"),
            Err(GraphError::ConfigurationKindMismatch { node: NodeKind::Model })
        );
        assert_eq!(graph.node(model).unwrap().title, "Model");

        let target = graph.create_node(NodeKind::Metric, Pos2::ZERO);
        graph.set_node_configuration(target, metric, "Accuracy").unwrap();
        let node = graph.node(target).unwrap();
        assert_eq!(node.title, "Accuracy");
        assert!(node.is_configured());
    }

    #[test]
    fn test_selection_and_delete_selected() {
        let mut graph = Graph::new();
        let a = graph.create_node(NodeKind::Dataset, Pos2::ZERO);
        let b = graph.create_node(NodeKind::Model, Pos2::new(300.0, 0.0));
        graph.create_edge(output_of(&graph, a), input_of(&graph, b)).unwrap();

        graph.select_only(a);
        graph.select_only(b);
        assert_eq!(graph.selected_nodes().collect::<Vec<_>>(), vec![b]);

        let removed = graph.delete_selected();
        assert_eq!(removed.len(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node(a).is_some());
    }

    #[test]
    fn test_snapshot_uses_port_names() {
        let mut graph = Graph::new();
        let dataset = graph.create_node(NodeKind::Dataset, Pos2::ZERO);
        let model = graph.create_node(NodeKind::Model, Pos2::new(300.0, 0.0));
        graph
            .create_edge(output_of(&graph, dataset), input_of(&graph, model))
            .unwrap();

        let snapshot = graph.snapshot();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.edges[0].source_port, "data");
        assert_eq!(snapshot.edges[0].target_port, "data");
        assert_eq!(snapshot.edges[0].source_node, dataset);
    }
}
