// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection rules between node kinds.
//!
//! The rules are pure: they look only at the two candidate ports and never at
//! the graph, so the model is never touched by a rejected attempt.

use crate::node::{NodeId, NodeKind};
use crate::port::{PortDirection, PortId};

/// Everything the rules need to know about one side of a candidate edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRef {
    /// Owning node
    pub node: NodeId,
    /// Kind of the owning node
    pub kind: NodeKind,
    /// Port on the node
    pub port: PortId,
    /// Port direction
    pub direction: PortDirection,
}

/// A candidate edge that passed every rule, ordered output -> input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidConnection {
    /// Output side
    pub source: PortRef,
    /// Input side
    pub target: PortRef,
}

/// Reasons a connection is refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// The kind table does not allow `from` to feed `to`
    #[error("A {from} node cannot connect to a {to} node")]
    IncompatibleKinds {
        /// Kind on the output side
        from: NodeKind,
        /// Kind on the input side
        to: NodeKind,
    },

    /// Both ports are inputs or both are outputs
    #[error("Cannot connect {from} to {to}: connect an output port to an input port")]
    SameDirection {
        /// Kind of the first port's node
        from: NodeKind,
        /// Kind of the second port's node
        to: NodeKind,
    },

    /// Both ports belong to the same node
    #[error("Cannot connect {from} to {to}: a node cannot connect to itself")]
    SelfLoop {
        /// Kind of the node
        from: NodeKind,
        /// Kind of the node (same as `from`)
        to: NodeKind,
    },
}

impl ConnectionError {
    /// Both node kinds named by the rejection
    pub fn kinds(&self) -> (NodeKind, NodeKind) {
        match *self {
            Self::IncompatibleKinds { from, to }
            | Self::SameDirection { from, to }
            | Self::SelfLoop { from, to } => (from, to),
        }
    }
}

/// Kinds a node of `source` kind may feed
pub fn legal_targets(source: NodeKind) -> &'static [NodeKind] {
    match source {
        NodeKind::Dataset => &[NodeKind::Processor, NodeKind::Model],
        NodeKind::Model => &[NodeKind::Processor, NodeKind::Metric],
        NodeKind::Processor => &[NodeKind::Processor, NodeKind::Model, NodeKind::Metric],
        NodeKind::Metric => &[],
    }
}

/// Whether the kind table permits `source -> target`
pub fn is_valid(source: NodeKind, target: NodeKind) -> bool {
    legal_targets(source).contains(&target)
}

/// Check a candidate edge between two ports, given in click order.
///
/// On success the pair is returned ordered output -> input, whichever side
/// was picked first.
pub fn validate(first: PortRef, second: PortRef) -> Result<ValidConnection, ConnectionError> {
    if first.node == second.node {
        return Err(ConnectionError::SelfLoop {
            from: first.kind,
            to: second.kind,
        });
    }

    if first.direction == second.direction {
        return Err(ConnectionError::SameDirection {
            from: first.kind,
            to: second.kind,
        });
    }

    let (source, target) = if first.direction == PortDirection::Output {
        (first, second)
    } else {
        (second, first)
    };

    if !is_valid(source.kind, target.kind) {
        return Err(ConnectionError::IncompatibleKinds {
            from: source.kind,
            to: target.kind,
        });
    }

    Ok(ValidConnection { source, target })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(kind: NodeKind, direction: PortDirection) -> PortRef {
        PortRef {
            node: NodeId::new(),
            kind,
            port: PortId(0),
            direction,
        }
    }

    #[test]
    fn test_kind_table() {
        assert!(!is_valid(NodeKind::Dataset, NodeKind::Metric));
        assert!(is_valid(NodeKind::Dataset, NodeKind::Model));
        assert!(is_valid(NodeKind::Dataset, NodeKind::Processor));
        assert!(is_valid(NodeKind::Model, NodeKind::Metric));
        assert!(is_valid(NodeKind::Model, NodeKind::Processor));
        assert!(!is_valid(NodeKind::Model, NodeKind::Dataset));
        assert!(!is_valid(NodeKind::Processor, NodeKind::Dataset));
        assert!(is_valid(NodeKind::Processor, NodeKind::Processor));
        assert!(is_valid(NodeKind::Processor, NodeKind::Metric));
    }

    #[test]
    fn test_metric_is_never_a_source() {
        for target in NodeKind::ALL {
            assert!(!is_valid(NodeKind::Metric, target), "Metric -> {target}");
        }
    }

    #[test]
    fn test_nothing_feeds_a_dataset() {
        for source in NodeKind::ALL {
            assert!(!is_valid(source, NodeKind::Dataset), "{source} -> Dataset");
        }
    }

    #[test]
    fn test_validate_orders_output_first() {
        let dataset_out = port(NodeKind::Dataset, PortDirection::Output);
        let model_in = port(NodeKind::Model, PortDirection::Input);

        let forward = validate(dataset_out, model_in).unwrap();
        let backward = validate(model_in, dataset_out).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward.source, dataset_out);
        assert_eq!(forward.target, model_in);
    }

    #[test]
    fn test_validate_rejects_same_direction() {
        let a = port(NodeKind::Dataset, PortDirection::Output);
        let b = port(NodeKind::Model, PortDirection::Output);
        assert_eq!(
            validate(a, b),
            Err(ConnectionError::SameDirection {
                from: NodeKind::Dataset,
                to: NodeKind::Model
            })
        );
    }

    #[test]
    fn test_validate_rejects_self_loop() {
        let output = port(NodeKind::Processor, PortDirection::Output);
        let input = PortRef {
            port: PortId(1),
            direction: PortDirection::Input,
            ..output
        };
        assert!(matches!(
            validate(output, input),
            Err(ConnectionError::SelfLoop { .. })
        ));
    }

    #[test]
    fn test_rejection_names_both_kinds() {
        let metric_in = port(NodeKind::Metric, PortDirection::Input);
        let dataset_out = port(NodeKind::Dataset, PortDirection::Output);

        let err = validate(metric_in, dataset_out).unwrap_err();
        assert_eq!(err.kinds(), (NodeKind::Dataset, NodeKind::Metric));

        let message = err.to_string();
        assert!(message.contains("Dataset"));
        assert!(message.contains("Metric"));
    }
}
