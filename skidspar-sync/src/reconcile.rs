//! Status reconciliation: decide what changed, merge only that.
//!
//! Per-record state machine:
//!
//! ```text
//! no external id          → SkippedNoId
//! external id seen before → Duplicate
//! not in directory        → Unmatched
//! matched, nothing stale  → Unchanged       (no broker write)
//! matched, stale          → Patched | PatchFailed | WouldPatch (dry run)
//! ```
//!
//! Record failures are logged and never abort the pass. A fixed delay follows
//! every record that reached a directory lookup.

use std::collections::HashSet;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use skidspar_client::ngsild::{DATE_LAST_PREPARATION, STATUS};
use skidspar_client::{BrokerClient, Fragment};
use skidspar_core::{
    timestamp, Directory, EntityId, ExternalId, ExternalStatusRecord, StoredEntitySummary,
};

/// Default throttle between records.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Options & outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Pause after each looked-up record.
    pub delay: Duration,
    /// Decide but never merge.
    pub dry_run: bool,
    /// Re-read each matched entity from the broker before deciding.
    pub refresh: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            dry_run: false,
            refresh: false,
        }
    }
}

/// What happened to one feed record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// The record had no external id; no lookup was attempted.
    SkippedNoId { facility_key: String },
    /// An earlier record in this pass carried the same external id.
    Duplicate {
        facility_key: String,
        external_id: ExternalId,
    },
    /// No broker entity for this external id.
    Unmatched { external_id: ExternalId },
    /// The broker already holds the reported state.
    Unchanged { entity_id: EntityId },
    /// A merge was issued and accepted.
    Patched {
        entity_id: EntityId,
        fragment: Fragment,
    },
    /// Dry run: this merge would have been issued.
    WouldPatch {
        entity_id: EntityId,
        fragment: Fragment,
    },
    /// The broker rejected the merge or was unreachable.
    PatchFailed { entity_id: EntityId, error: String },
    /// Refresh mode: the entity could not be re-read.
    RefreshFailed { entity_id: EntityId, error: String },
}

/// Outcomes of one reconcile run, in feed order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileResult {
    pub outcomes: Vec<RecordOutcome>,
    /// The run stopped early on cancellation.
    pub cancelled: bool,
}

impl ReconcileResult {
    /// Number of merges issued (accepted or not).
    pub fn merge_attempts(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    RecordOutcome::Patched { .. } | RecordOutcome::PatchFailed { .. }
                )
            })
            .count()
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Which fields are stale, and the fragment that would fix them.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub status_changed: bool,
    pub preparation_changed: bool,
    pub fragment: Fragment,
}

impl Decision {
    pub fn is_noop(&self) -> bool {
        !self.status_changed && !self.preparation_changed
    }
}

/// Compare a feed record against the broker's last-known state.
///
/// - status is stale only when the stored status is non-empty and differs;
/// - preparation is stale when the feed reports a valid RFC3339 timestamp
///   whose canonical form differs from the stored string. An unparsable
///   timestamp is logged and the field skipped.
pub fn decide(record: &ExternalStatusRecord, stored: &StoredEntitySummary) -> Decision {
    let current_status = record.current_status();
    let mut fragment = Fragment::new();

    let status_changed = !stored.status.is_empty() && stored.status != current_status.as_str();
    if status_changed {
        tracing::info!(
            entity_id = %stored.entity_id,
            from = %stored.status,
            to = %current_status,
            "entity has changed status"
        );
        fragment = fragment.text(STATUS, current_status.as_str());
    }

    let mut preparation_changed = false;
    if let Some(raw) = record.last_preparation.as_deref().filter(|p| !p.is_empty()) {
        match timestamp::canonical_rfc3339(raw) {
            Ok(canonical) => {
                if canonical != stored.last_preparation {
                    tracing::info!(
                        entity_id = %stored.entity_id,
                        stored = %stored.last_preparation,
                        reported = %canonical,
                        "last known preparation has changed"
                    );
                    fragment = fragment.date_time(DATE_LAST_PREPARATION, &canonical);
                    preparation_changed = true;
                }
            }
            Err(err) => {
                tracing::warn!(
                    entity_id = %stored.entity_id,
                    error = %err,
                    "failed to parse entity preparation timestamp"
                );
            }
        }
    }

    Decision {
        status_changed,
        preparation_changed,
        fragment,
    }
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Reconcile every feed record against `directory`, one at a time.
///
/// Cancellation aborts the in-flight broker call or delay and stops the run;
/// outcomes recorded so far are returned with `cancelled` set.
pub async fn reconcile(
    records: &[ExternalStatusRecord],
    directory: &Directory,
    broker: &dyn BrokerClient,
    options: &ReconcileOptions,
    cancel: &CancellationToken,
) -> ReconcileResult {
    let mut result = ReconcileResult::default();
    let mut seen = HashSet::new();

    for record in records {
        if cancel.is_cancelled() {
            result.cancelled = true;
            break;
        }

        if record.external_id.is_empty() {
            result.outcomes.push(RecordOutcome::SkippedNoId {
                facility_key: record.facility_key.clone(),
            });
            continue;
        }

        if !seen.insert(record.external_id.clone()) {
            tracing::warn!(
                facility = %record.facility_key,
                external_id = %record.external_id,
                "external id already reconciled in this pass, skipping"
            );
            result.outcomes.push(RecordOutcome::Duplicate {
                facility_key: record.facility_key.clone(),
                external_id: record.external_id.clone(),
            });
            continue;
        }

        let span = tracing::info_span!(
            "record",
            facility = %record.facility_key,
            external_id = %record.external_id
        );
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                result.cancelled = true;
                break;
            }
            outcome = reconcile_record(record, directory, broker, options).instrument(span) => outcome,
        };
        result.outcomes.push(outcome);

        if !options.delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    result.cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(options.delay) => {}
            }
        }
    }

    if result.cancelled {
        tracing::warn!(
            processed = result.outcomes.len(),
            total = records.len(),
            "reconciliation cancelled"
        );
    }
    result
}

async fn reconcile_record(
    record: &ExternalStatusRecord,
    directory: &Directory,
    broker: &dyn BrokerClient,
    options: &ReconcileOptions,
) -> RecordOutcome {
    let Some(stored) = directory.get(&record.external_id) else {
        tracing::info!("entity not found");
        return RecordOutcome::Unmatched {
            external_id: record.external_id.clone(),
        };
    };

    let stored = if options.refresh {
        match broker.retrieve_entity(&stored.entity_id).await {
            Ok(state) => StoredEntitySummary {
                status: state.status,
                last_preparation: state.last_preparation,
                ..stored.clone()
            },
            Err(err) if err.is_not_found() => {
                tracing::info!(entity_id = %stored.entity_id, "no such entity in broker");
                return RecordOutcome::Unmatched {
                    external_id: record.external_id.clone(),
                };
            }
            Err(err) => {
                tracing::error!(entity_id = %stored.entity_id, error = %err, "failed to retrieve entity");
                return RecordOutcome::RefreshFailed {
                    entity_id: stored.entity_id.clone(),
                    error: err.to_string(),
                };
            }
        }
    } else {
        stored.clone()
    };

    tracing::info!(entity_id = %stored.entity_id, "found preparation status");

    let decision = decide(record, &stored);
    if decision.is_noop() {
        tracing::info!(entity_id = %stored.entity_id, "neither status nor preparation time has changed");
        return RecordOutcome::Unchanged {
            entity_id: stored.entity_id,
        };
    }

    if options.dry_run {
        tracing::info!(entity_id = %stored.entity_id, "[dry-run] would merge entity");
        return RecordOutcome::WouldPatch {
            entity_id: stored.entity_id,
            fragment: decision.fragment,
        };
    }

    match broker.merge_entity(&stored.entity_id, &decision.fragment).await {
        Ok(()) => {
            tracing::info!(entity_id = %stored.entity_id, "merged entity");
            RecordOutcome::Patched {
                entity_id: stored.entity_id,
                fragment: decision.fragment,
            }
        }
        Err(err) => {
            tracing::error!(entity_id = %stored.entity_id, error = %err, "failed to merge entity");
            RecordOutcome::PatchFailed {
                entity_id: stored.entity_id,
                error: err.to_string(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use skidspar_core::EntityType;

    fn stored(status: &str, preparation: &str) -> StoredEntitySummary {
        StoredEntitySummary {
            entity_id: EntityId::from("urn:ngsi-ld:ExerciseTrail:123"),
            entity_type: EntityType::ExerciseTrail,
            status: status.to_string(),
            last_preparation: preparation.to_string(),
        }
    }

    fn record(is_active: bool, preparation: Option<&str>) -> ExternalStatusRecord {
        ExternalStatusRecord {
            facility_key: "Kallaspåret:123".to_string(),
            external_id: ExternalId::from("123"),
            is_active,
            last_preparation: preparation.map(str::to_string),
        }
    }

    #[test]
    fn empty_stored_state_patches_preparation_only() {
        let decision = decide(&record(true, Some("2021-12-17T16:54:02Z")), &stored("", ""));
        assert!(!decision.status_changed);
        assert!(decision.preparation_changed);
        assert!(!decision.fragment.contains(STATUS));
        assert_eq!(
            decision.fragment.last_preparation(),
            Some("2021-12-17T16:54:02Z")
        );
    }

    #[test]
    fn identical_state_is_noop() {
        let decision = decide(
            &record(false, Some("2021-12-17T16:54:02Z")),
            &stored("closed", "2021-12-17T16:54:02Z"),
        );
        assert!(decision.is_noop());
        assert!(decision.fragment.is_empty());
    }

    #[test]
    fn status_flip_patches_status_only() {
        let decision = decide(&record(false, None), &stored("open", ""));
        assert!(decision.status_changed);
        assert!(!decision.preparation_changed);
        assert_eq!(decision.fragment.status(), Some("closed"));
        assert!(!decision.fragment.contains(DATE_LAST_PREPARATION));
    }

    #[test]
    fn equal_after_canonicalization_is_noop() {
        let decision = decide(
            &record(true, Some("2021-12-17T16:54:02.000+00:00")),
            &stored("open", "2021-12-17T16:54:02Z"),
        );
        assert!(decision.is_noop());
    }

    #[test]
    fn unparsable_preparation_is_skipped() {
        let decision = decide(&record(false, Some("17/12/2021")), &stored("open", ""));
        assert!(decision.status_changed);
        assert!(!decision.preparation_changed);
        assert!(!decision.fragment.contains(DATE_LAST_PREPARATION));
    }

    #[test]
    fn missing_feed_preparation_never_clears() {
        let decision = decide(&record(true, None), &stored("open", "2021-12-17T16:54:02Z"));
        assert!(decision.is_noop());
    }

    #[test]
    fn merge_attempts_counts_patched_and_failed() {
        let result = ReconcileResult {
            outcomes: vec![
                RecordOutcome::Patched {
                    entity_id: EntityId::from("a"),
                    fragment: Fragment::new().text(STATUS, "open"),
                },
                RecordOutcome::PatchFailed {
                    entity_id: EntityId::from("b"),
                    error: "boom".to_string(),
                },
                RecordOutcome::Unchanged {
                    entity_id: EntityId::from("c"),
                },
            ],
            cancelled: false,
        };
        assert_eq!(result.merge_attempts(), 2);
    }
}
