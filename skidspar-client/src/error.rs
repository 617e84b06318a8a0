//! Error types for skidspar-client.

use thiserror::Error;

/// All errors that can arise talking to the broker or the provider.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: connection refused, DNS, TLS, timeout, body read.
    #[error("{source_name} unavailable: {source}")]
    SourceUnavailable {
        source_name: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The source answered with an unexpected HTTP status.
    #[error(
        "{source_name} returned status code {status} (content-type: {content_type}, body: {body})"
    )]
    SourceRejected {
        source_name: &'static str,
        status: u16,
        content_type: String,
        body: String,
    },

    /// The payload could not be decoded into the expected shape.
    #[error("malformed response from {source_name}: {source}")]
    MalformedResponse {
        source_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The broker has no entity with this id.
    #[error("entity {entity_id} not found in broker")]
    NotFound { entity_id: String },

    /// The broker rejected a merge.
    #[error("merge of {entity_id} rejected with status {status}: {body}")]
    WriteFailure {
        entity_id: String,
        status: u16,
        body: String,
    },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}
