//! Forgiving field decoders for driver-supplied graph data.
//!
//! A field holding a value of the wrong type decodes as `None` rather
//! than failing the enclosing node, link or message. Graph data is
//! decorative, so a bad field must never cost the driver its whole layout.
//! The same holds one level up: a malformed array element decodes as an
//! empty record, which loading then skips or counts as a dropped link.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

use super::link::LinkEndpoint;
use super::node::NodeId;

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose<T> {
    Valid(T),
    Other(IgnoredAny),
}

impl<T> Loose<T> {
    fn into_option(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Other(_) => None,
        }
    }
}

pub(crate) fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Loose::<f64>::deserialize(deserializer)?.into_option())
}

pub(crate) fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Loose::<String>::deserialize(deserializer)?.into_option())
}

pub(crate) fn node_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NodeId>, D::Error> {
    Ok(Loose::<NodeId>::deserialize(deserializer)?.into_option())
}

pub(crate) fn endpoint<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<LinkEndpoint>, D::Error> {
    Ok(Loose::<LinkEndpoint>::deserialize(deserializer)?.into_option())
}

pub(crate) fn records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let items = Loose::<Vec<Loose<T>>>::deserialize(deserializer)?
        .into_option()
        .unwrap_or_default();
    Ok(items
        .into_iter()
        .map(|item| item.into_option().unwrap_or_default())
        .collect())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Field {
        #[serde(default, deserialize_with = "super::number")]
        value: Option<f64>,
    }

    fn field(json: &str) -> Option<f64> {
        serde_json::from_str::<Field>(json).unwrap().value
    }

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Point {
        x: f64,
    }

    #[derive(Deserialize)]
    struct Points {
        #[serde(default, deserialize_with = "super::records")]
        items: Vec<Point>,
    }

    fn points(json: &str) -> Vec<Point> {
        serde_json::from_str::<Points>(json).unwrap().items
    }

    #[test]
    fn test_number_accepts_ints_and_floats() {
        assert_eq!(field(r#"{"value": 3}"#), Some(3.0));
        assert_eq!(field(r#"{"value": -2.5}"#), Some(-2.5));
    }

    #[test]
    fn test_number_ignores_other_types() {
        assert_eq!(field(r#"{"value": "3"}"#), None);
        assert_eq!(field(r#"{"value": null}"#), None);
        assert_eq!(field(r#"{"value": {"nested": true}}"#), None);
        assert_eq!(field(r#"{}"#), None);
    }

    #[test]
    fn test_records_replace_malformed_elements() {
        assert_eq!(
            points(r#"{"items": [{"x": 1}, null, "x", {"x": 2}]}"#),
            vec![Point { x: 1.0 }, Point::default(), Point::default(), Point { x: 2.0 }]
        );
    }

    #[test]
    fn test_records_tolerate_non_arrays() {
        assert!(points(r#"{"items": 5}"#).is_empty());
        assert!(points(r#"{"items": null}"#).is_empty());
        assert!(points(r#"{}"#).is_empty());
    }
}
