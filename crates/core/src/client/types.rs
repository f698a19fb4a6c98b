//! Domain records produced by the mirror clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    /// Absolute series URL on the mirror that produced the hit.
    pub url: String,
    pub subtitle: String,
}

/// Value of a series attribute: either one string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    /// All values as a flat list.
    pub fn values(&self) -> Vec<&str> {
        match self {
            AttributeValue::Text(text) => vec![text.as_str()],
            AttributeValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// A chapter entry in a series listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub title: String,
    pub url: String,
    pub label: String,
}

/// Metadata and chapter listing of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub title: String,
    pub description: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Oldest chapter first.
    pub chapters: Vec<ChapterRef>,
    /// Series URL on the mirror that answered.
    pub canonical_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_value_serializes_untagged() {
        let text = AttributeValue::Text("Ongoing".to_string());
        let list = AttributeValue::List(vec!["Action".to_string(), "Comedy".to_string()]);
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"Ongoing\"");
        assert_eq!(serde_json::to_string(&list).unwrap(), "[\"Action\",\"Comedy\"]");
    }

    #[test]
    fn test_attribute_values_flatten() {
        let list = AttributeValue::List(vec!["A".to_string(), "B".to_string()]);
        assert_eq!(list.values(), vec!["A", "B"]);
        assert_eq!(AttributeValue::Text("C".to_string()).values(), vec!["C"]);
    }
}
