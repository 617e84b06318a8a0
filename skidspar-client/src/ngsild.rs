//! NGSI-LD constants and the lenient entity DTO shared by listing and retrieve.
//!
//! Broker entities may arrive in key-value form (`"status": "open"`) or in
//! normalized form (`"status": {"type": "Property", "value": "open"}`); date
//! times may be plain strings or `{"@type": "DateTime", "@value": ...}`.

use serde::Deserialize;

/// Default JSON-LD context served by the diwise context broker.
pub const DEFAULT_CONTEXT_URL: &str =
    "https://raw.githubusercontent.com/diwise/context-broker/main/assets/jsonldcontexts/default-context.jsonld";

/// Content type for NGSI-LD bodies.
pub const LD_JSON: &str = "application/ld+json";

/// Tenant that is addressed without an `NGSILD-Tenant` header.
pub const DEFAULT_TENANT: &str = "default";

pub const TENANT_HEADER: &str = "NGSILD-Tenant";

pub const STATUS: &str = "status";
pub const DATE_LAST_PREPARATION: &str = "dateLastPreparation";

/// `Link` header value pointing at the default context.
pub fn link_header() -> String {
    format!(
        "<{DEFAULT_CONTEXT_URL}>; rel=\"http://www.w3.org/ns/json-ld#context\"; type=\"{LD_JSON}\""
    )
}

/// An attribute value in any of the shapes the broker produces.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Typed {
        #[serde(rename = "@value")]
        value: String,
    },
    Normalized {
        value: Box<PropertyValue>,
    },
    Other(serde_json::Value),
}

impl PropertyValue {
    /// The textual content, or an empty string for shapes we do not read.
    pub fn into_text(self) -> String {
        match self {
            PropertyValue::Text(text) => text,
            PropertyValue::Typed { value } => value,
            PropertyValue::Normalized { value } => value.into_text(),
            PropertyValue::Other(_) => String::new(),
        }
    }
}

/// Just the parts of an entity the reconciler reads.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDto {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub status: Option<PropertyValue>,
    #[serde(rename = "dateLastPreparation", default)]
    pub date_last_preparation: Option<PropertyValue>,
}

impl EntityDto {
    pub fn status_text(&self) -> String {
        self.status.clone().map(PropertyValue::into_text).unwrap_or_default()
    }

    pub fn last_preparation_text(&self) -> String {
        self.date_last_preparation
            .clone()
            .map(PropertyValue::into_text)
            .unwrap_or_default()
    }
}
