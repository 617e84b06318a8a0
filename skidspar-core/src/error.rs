//! Error types for skidspar-core.

use thiserror::Error;

/// Errors raised while interpreting values from either data source.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A preparation timestamp is not valid RFC3339.
    #[error("invalid RFC3339 timestamp '{value}': {source}")]
    ParseFailure {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// An entity id format contains more than one `%s` placeholder.
    #[error("invalid entity id format '{format}': expected at most one '%s'")]
    InvalidIdFormat { format: String },
}
