//! Node identifier and input shape.
//!
//! Nodes arrive from the driver as loosely-typed objects:
//! `{ id, label?, r?, x?, y? }`. The identifier is opaque to the
//! simulation; it only has to be hashable so links can be resolved and
//! snapshots can echo it back in the form it came in.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::lenient;

/// Stable node identifier, as supplied by the driver.
///
/// JS drivers use both numeric and string ids, so both are accepted and
/// re-emitted unchanged. `Int(1)` and `Text("1")` are distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeIdVisitor)
    }
}

struct NodeIdVisitor;

impl Visitor<'_> for NodeIdVisitor {
    type Value = NodeId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or an integer node id")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<NodeId, E> {
        Ok(NodeId::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<NodeId, E> {
        i64::try_from(v)
            .map(NodeId::Int)
            .map_err(|_| E::custom("node id out of range"))
    }

    // JS numbers arrive as f64; only integral values are usable as ids.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<NodeId, E> {
        if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER {
            Ok(NodeId::Int(v as i64))
        } else {
            Err(E::custom("node id must be an integer"))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<NodeId, E> {
        Ok(NodeId::Text(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<NodeId, E> {
        Ok(NodeId::Text(v))
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "Node({n})"),
            Self::Text(s) => write!(f, "Node({s:?})"),
        }
    }
}

impl From<&str> for NodeId {
    #[inline]
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl From<String> for NodeId {
    #[inline]
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl From<i64> for NodeId {
    #[inline]
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

/// A node as the driver describes it.
///
/// Every field except `id` is optional, and a field of the wrong type is
/// read as absent instead of rejecting the whole dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
    #[serde(default, deserialize_with = "lenient::node_id")]
    pub id: Option<NodeId>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub r: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl NodeInput {
    /// A node with only an id; position is left to the simulation.
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Set the starting position.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Set the collision radius.
    pub fn with_radius(mut self, r: f64) -> Self {
        self.r = Some(r);
        self
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The caller-supplied position, when both coordinates are finite.
    pub fn finite_position(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(format!("{}", NodeId::Int(42)), "Node(42)");
        assert_eq!(format!("{}", NodeId::from("bank")), "Node(\"bank\")");
    }

    #[test]
    fn test_int_and_text_ids_differ() {
        assert_ne!(NodeId::Int(1), NodeId::from("1"));
    }

    #[test]
    fn test_node_id_roundtrips_form() {
        let int: NodeId = serde_json::from_str("7").unwrap();
        let text: NodeId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(int, NodeId::Int(7));
        assert_eq!(text, NodeId::from("7"));
        assert_eq!(serde_json::to_string(&int).unwrap(), "7");
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"7\"");
    }

    #[test]
    fn test_integral_float_id() {
        let id: NodeId = serde_json::from_str("3.0").unwrap();
        assert_eq!(id, NodeId::Int(3));
        assert!(serde_json::from_str::<NodeId>("3.5").is_err());
    }

    #[test]
    fn test_finite_position() {
        assert_eq!(NodeInput::new("a").at(1.0, 2.0).finite_position(), Some((1.0, 2.0)));
        assert_eq!(NodeInput::new("a").at(f64::NAN, 2.0).finite_position(), None);
        assert_eq!(NodeInput::new("a").at(1.0, f64::INFINITY).finite_position(), None);

        let mut only_x = NodeInput::new("a");
        only_x.x = Some(3.0);
        assert_eq!(only_x.finite_position(), None);
    }

    #[test]
    fn test_wrong_typed_fields_read_as_absent() {
        let node: NodeInput =
            serde_json::from_str(r#"{"id": "a", "label": 5, "r": "big", "x": null, "y": [1]}"#)
                .unwrap();
        assert_eq!(node.id, Some(NodeId::from("a")));
        assert_eq!(node.label, None);
        assert_eq!(node.r, None);
        assert_eq!(node.x, None);
        assert_eq!(node.y, None);
    }

    #[test]
    fn test_missing_id() {
        let node: NodeInput = serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
        assert_eq!(node.id, None);
        assert_eq!(node.finite_position(), Some((1.0, 2.0)));
    }
}
