//! Link input shape and the resolved spring it becomes.
//!
//! Links are spring constraints between two nodes. Each link has:
//! - Source and target endpoints, given as a bare id or as `{ id }`
//! - Rest length and stiffness for the spring phase
//! - A weight that is carried along but not used by the physics

use serde::{Deserialize, Serialize};

use super::lenient;
use super::node::NodeId;

/// One end of a link as the driver wrote it.
///
/// Force-layout drivers often replace endpoint ids with the node objects
/// themselves after a first layout pass, so both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkEndpoint {
    Id(NodeId),
    Node { id: NodeId },
}

impl LinkEndpoint {
    /// The node id this endpoint refers to.
    #[inline]
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Id(id) | Self::Node { id } => id,
        }
    }
}

impl From<&str> for LinkEndpoint {
    fn from(id: &str) -> Self {
        Self::Id(id.into())
    }
}

/// A link as the driver describes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkInput {
    #[serde(default, deserialize_with = "lenient::endpoint")]
    pub source: Option<LinkEndpoint>,
    #[serde(default, deserialize_with = "lenient::endpoint")]
    pub target: Option<LinkEndpoint>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl LinkInput {
    /// A link between two node ids with default spring parameters.
    pub fn new(source: impl Into<LinkEndpoint>, target: impl Into<LinkEndpoint>) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Set the rest length.
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Set the stiffness multiplier.
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    /// Set the informational weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// A link after its endpoints resolved against the current node set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    /// Index of the source node.
    pub source: usize,
    /// Index of the target node.
    pub target: usize,
    /// Distance the spring relaxes toward.
    pub rest_length: f64,
    /// Stiffness multiplier.
    pub strength: f64,
    /// Informational only.
    pub weight: f64,
}
