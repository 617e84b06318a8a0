//! Error types for skidspar-sync.

use thiserror::Error;

use skidspar_client::ClientError;
use skidspar_core::EntityType;

/// Failures that abort a whole pass.
///
/// Per-record failures never surface here; they are logged and reported as
/// [`RecordOutcome`](crate::RecordOutcome)s.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The broker listing for one entity type failed; no directory is built.
    #[error("failed to load {entity_type} entities from broker: {source}")]
    Directory {
        entity_type: EntityType,
        #[source]
        source: ClientError,
    },

    /// The provider status feed could not be loaded.
    #[error("failed to retrieve entity status: {0}")]
    StatusFeed(#[source] ClientError),

    /// The caller cancelled the pass before reconciliation started.
    #[error("reconciliation pass cancelled")]
    Cancelled,
}
