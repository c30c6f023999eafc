// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a port, unique within its owning node.
///
/// Ids are handed out by the node kind template in declaration order, so the
/// same kind always produces the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortId(pub u32);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port#{}", self.0)
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Accepts an edge
    Input,
    /// Emits an edge
    Output,
}

impl PortDirection {
    /// The direction a port must have to pair with this one
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// A port on a node.
///
/// `position` is derived state: it is always `owner.position + offset` after
/// the owning graph has run its recompute pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Port ID (unique within the node)
    pub id: PortId,
    /// Port name
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Offset from the owning node's top-left corner (canvas space)
    pub offset: Vec2,
    /// Last computed canvas-space position
    pub position: Pos2,
}

impl Port {
    /// Create a new port at the given template offset
    pub fn new(
        id: PortId,
        name: impl Into<String>,
        direction: PortDirection,
        offset: Vec2,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            direction,
            offset,
            position: Pos2::ZERO + offset,
        }
    }

    /// Recompute the canvas position from the owner's position
    pub fn place(&mut self, owner_position: Pos2) {
        self.position = owner_position + self.offset;
    }

    /// Whether this port is an input
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Whether this port is an output
    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_follows_owner() {
        let mut port = Port::new(PortId(0), "data", PortDirection::Output, Vec2::new(180.0, 36.0));
        port.place(Pos2::new(10.0, 20.0));
        assert_eq!(port.position, Pos2::new(190.0, 56.0));

        port.place(Pos2::new(-50.0, 0.0));
        assert_eq!(port.position, Pos2::new(130.0, 36.0));
    }

    #[test]
    fn test_opposite_direction() {
        assert_eq!(PortDirection::Input.opposite(), PortDirection::Output);
        assert_eq!(PortDirection::Output.opposite(), PortDirection::Input);
    }
}
