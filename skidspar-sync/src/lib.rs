//! # skidspar-sync
//!
//! The reconciliation engine: build the broker [`Directory`](skidspar_core::Directory),
//! compare each provider status record against it, and merge only what changed.
//!
//! Call [`pipeline::run_pass`] for a complete directory → feed → reconcile pass,
//! or use [`build_directory`] and [`reconcile`] directly.

pub mod directory;
pub mod error;
pub mod pipeline;
pub mod reconcile;

pub use directory::build_directory;
pub use error::SyncError;
pub use pipeline::{run_pass, PassConfig, PassReport};
pub use reconcile::{decide, reconcile, Decision, ReconcileOptions, ReconcileResult, RecordOutcome};
