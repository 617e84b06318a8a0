//! skidspar: one reconciliation pass from längdspår.se into a context broker.
//!
//! # Usage
//!
//! ```text
//! CONTEXT_BROKER_URL=http://context-broker:8080 \
//! LS_LOCATION=<location> LS_API_KEY=<key> \
//! NGSI_TRAILID_FORMAT=urn:ngsi-ld:ExerciseTrail:%s \
//! NGSI_SPORTSFIELDID_FORMAT=urn:ngsi-ld:SportsField:%s \
//!   skidspar [--dry-run] [--refresh]
//! ```

mod config;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use skidspar_client::{HttpBrokerClient, StatusFetcher};
use skidspar_sync::{run_pass, PassReport};

use config::Config;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let config = Config::parse();
    telemetry::init(config.log_format);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let result = runtime.block_on(run(config));

    tracing::info!("running cleanup");
    result?;
    tracing::info!("done");
    Ok(())
}

/// Run one pass. Only configuration errors are returned; a failed or
/// cancelled pass is logged and the process still exits cleanly.
async fn run(config: Config) -> Result<()> {
    let pass_config = config.pass_config()?;
    let broker = HttpBrokerClient::new(config.broker_config());
    let fetcher = StatusFetcher::new(config.provider_url.as_str());

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(watch_ctrl_c(cancel.clone()));

    tracing::info!(
        broker_url = %config.broker_url,
        tenant = %config.tenant,
        location = %config.location,
        types = pass_config.type_formats.len(),
        dry_run = config.dry_run,
        refresh = config.refresh,
        "starting reconciliation pass"
    );

    match run_pass(&broker, &fetcher, &pass_config, &cancel).await {
        Ok(report) => log_report(&report),
        Err(err) => tracing::error!(error = %err, "reconciliation pass failed"),
    }

    signal_task.abort();
    Ok(())
}

async fn watch_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("received ctrl-c, cancelling pass");
            cancel.cancel();
        }
        Err(err) => tracing::warn!(error = %err, "ctrl-c handler failed"),
    }
}

fn log_report(report: &PassReport) {
    if report.cancelled {
        tracing::warn!(
            processed = report.outcomes.len(),
            feed_records = report.feed_records,
            "pass cancelled before all records were processed"
        );
    }
    if report.failed() > 0 {
        tracing::warn!(failed = report.failed(), "some entities could not be updated");
    }
}
