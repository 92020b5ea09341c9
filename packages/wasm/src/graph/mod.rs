//! Graph input data.
//!
//! This module describes the dataset a driver hands to the simulation:
//! nodes with optional positions and radii, and links between node ids.
//! Decoding is deliberately forgiving; resolution into physics state
//! happens in [`crate::simulation`].

pub(crate) mod lenient;
mod link;
mod node;

use serde::{Deserialize, Serialize};

pub use link::{LinkEndpoint, LinkInput, Spring};
pub use node::{NodeId, NodeInput};

/// A full dataset: every node and link the simulation should hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default, deserialize_with = "lenient::records")]
    pub nodes: Vec<NodeInput>,
    #[serde(default, deserialize_with = "lenient::records")]
    pub links: Vec<LinkInput>,
}

impl GraphData {
    /// Create a dataset from nodes and links.
    pub fn new(nodes: Vec<NodeInput>, links: Vec<LinkInput>) -> Self {
        Self { nodes, links }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_dataset() {
        let data: GraphData = serde_json::from_str(
            r#"{
                "nodes": [{"id": "bank", "label": "Bank", "r": 18}, {"id": "checking", "x": 10, "y": 20}],
                "links": [{"source": "bank", "target": {"id": "checking"}, "distance": 90, "strength": 0.8, "weight": 2}]
            }"#,
        )
        .unwrap();

        assert_eq!(data.nodes.len(), 2);
        assert_eq!(data.nodes[0].label.as_deref(), Some("Bank"));
        assert_eq!(data.nodes[0].r, Some(18.0));
        assert_eq!(data.nodes[1].finite_position(), Some((10.0, 20.0)));
        assert_eq!(data.links.len(), 1);
        assert_eq!(data.links[0].weight, Some(2.0));
    }

    #[test]
    fn test_malformed_elements_keep_the_rest() {
        let data: GraphData = serde_json::from_str(
            r#"{"nodes": [{"id": "a"}, null, {"id": "b"}], "links": [{"source": "a", "target": "b"}, "junk"]}"#,
        )
        .unwrap();

        assert_eq!(data.nodes.len(), 3);
        assert_eq!(data.nodes[0].id, Some(NodeId::from("a")));
        assert_eq!(data.nodes[1], NodeInput::default());
        assert_eq!(data.nodes[2].id, Some(NodeId::from("b")));
        assert_eq!(data.links.len(), 2);
        assert_eq!(data.links[1], LinkInput::default());
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let data: GraphData = serde_json::from_str("{}").unwrap();
        assert!(data.nodes.is_empty());
        assert!(data.links.is_empty());
    }
}
