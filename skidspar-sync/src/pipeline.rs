//! One reconciliation pass: directory → status feed → reconcile.

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use skidspar_client::{BrokerClient, StatusFetcher};
use skidspar_core::TypeFormat;

use crate::directory::build_directory;
use crate::error::SyncError;
use crate::reconcile::{reconcile, ReconcileOptions, RecordOutcome};

/// Everything a pass needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PassConfig {
    /// Entity types to list, in query order.
    pub type_formats: Vec<TypeFormat>,
    pub location: String,
    pub api_key: String,
    pub options: ReconcileOptions,
}

/// Summary of a completed (or cancelled) pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub directory_entries: usize,
    pub feed_records: usize,
    pub outcomes: Vec<RecordOutcome>,
    pub cancelled: bool,
}

impl PassReport {
    pub fn patched(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                RecordOutcome::Patched { .. } | RecordOutcome::WouldPatch { .. }
            )
        })
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Unchanged { .. }))
    }

    pub fn unmatched(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Unmatched { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                RecordOutcome::PatchFailed { .. } | RecordOutcome::RefreshFailed { .. }
            )
        })
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                RecordOutcome::SkippedNoId { .. } | RecordOutcome::Duplicate { .. }
            )
        })
    }

    fn count(&self, pred: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

/// Run one full pass.
///
/// Failing to build the directory or to fetch the status feed aborts the
/// pass; per-record failures are reported in the returned [`PassReport`].
pub async fn run_pass(
    broker: &dyn BrokerClient,
    fetcher: &StatusFetcher,
    config: &PassConfig,
    cancel: &CancellationToken,
) -> Result<PassReport, SyncError> {
    let span = tracing::info_span!("reconcile_pass", location = %config.location);
    async move {
        let directory = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            directory = build_directory(broker, &config.type_formats) => directory?,
        };

        let records = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            records = fetcher.fetch_status(&config.location, &config.api_key) => {
                records.map_err(SyncError::StatusFeed)?
            }
        };
        tracing::info!(
            directory_entries = directory.len(),
            feed_records = records.len(),
            "loaded directory and status feed"
        );

        let result = reconcile(&records, &directory, broker, &config.options, cancel).await;
        let merge_attempts = result.merge_attempts();

        let report = PassReport {
            directory_entries: directory.len(),
            feed_records: records.len(),
            outcomes: result.outcomes,
            cancelled: result.cancelled,
        };
        tracing::info!(
            patched = report.patched(),
            unchanged = report.unchanged(),
            unmatched = report.unmatched(),
            failed = report.failed(),
            skipped = report.skipped(),
            merge_attempts,
            dry_run = config.options.dry_run,
            "reconciliation pass finished"
        );
        Ok(report)
    }
    .instrument(span)
    .await
}
