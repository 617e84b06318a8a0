//! Skidspår core library: facility domain types, id formats, timestamps.
//!
//! Public API surface:
//! - [`types`]: newtypes, status domain, feed records and broker summaries
//! - [`directory`]: the per-pass index of stored entities
//! - [`timestamp`]: RFC3339 canonicalization
//! - [`error`]: [`CoreError`]

pub mod directory;
pub mod error;
pub mod timestamp;
pub mod types;

pub use directory::Directory;
pub use error::CoreError;
pub use types::{
    EntityId, EntityType, ExternalId, ExternalStatusRecord, FacilityStatus, IdFormat,
    StoredEntitySummary, TypeFormat,
};
