//! Read-only position reports handed to the driver after each step.

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// Where one node is right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

/// Positions of every node after a step.
///
/// Velocity, radius and label are not repeated; the driver already has
/// them from the dataset it sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<NodePosition>,
}

impl Snapshot {
    /// Position reported for `id`, if present.
    pub fn get(&self, id: &NodeId) -> Option<(f64, f64)> {
        self.nodes
            .iter()
            .find(|node| &node.id == id)
            .map(|node| (node.x, node.y))
    }

    /// Number of nodes in the snapshot.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the snapshot holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
