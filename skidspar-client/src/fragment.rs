//! Merge fragments: partial entity updates holding only changed properties.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::ngsild::{DATE_LAST_PREPARATION, DEFAULT_CONTEXT_URL, STATUS};

/// An NGSI-LD entity fragment for a merge-patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    #[serde(rename = "@context")]
    context: Vec<&'static str>,
    #[serde(flatten)]
    properties: Map<String, Value>,
}

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}

impl Fragment {
    pub fn new() -> Self {
        Self {
            context: vec![DEFAULT_CONTEXT_URL],
            properties: Map::new(),
        }
    }

    /// Add a text property.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": "Property", "value": value }),
        );
        self
    }

    /// Add a property holding a typed `DateTime` value.
    pub fn date_time(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({
                "type": "Property",
                "value": { "@type": "DateTime", "@value": value },
            }),
        );
        self
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// The `status` text, when present.
    pub fn status(&self) -> Option<&str> {
        self.properties
            .get(STATUS)
            .and_then(|p| p.get("value"))
            .and_then(Value::as_str)
    }

    /// The `dateLastPreparation` timestamp, when present.
    pub fn last_preparation(&self) -> Option<&str> {
        self.properties
            .get(DATE_LAST_PREPARATION)
            .and_then(|p| p.get("value"))
            .and_then(|v| v.get("@value"))
            .and_then(Value::as_str)
    }
}
