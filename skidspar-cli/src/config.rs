//! Environment-driven configuration.
//!
//! Every setting has an environment variable; the flags exist for local runs.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use skidspar_client::provider::DEFAULT_PROVIDER_URL;
use skidspar_client::BrokerConfig;
use skidspar_core::{EntityType, IdFormat, TypeFormat};
use skidspar_sync::{PassConfig, ReconcileOptions};

use crate::telemetry::LogFormat;

/// Lower bound for the inter-record throttle.
pub const MIN_DELAY: Duration = Duration::from_millis(500);

#[derive(Parser, Debug, Clone)]
#[command(
    name = "skidspar",
    version,
    about = "Reconcile ski trail and sports field status from längdspår.se into an NGSI-LD context broker",
    long_about = None,
)]
pub struct Config {
    /// Context broker base URL.
    #[arg(long, env = "CONTEXT_BROKER_URL")]
    pub broker_url: String,

    /// Broker tenant; `default` sends no tenant header.
    #[arg(long, env = "CONTEXT_BROKER_TENANT", default_value = "default")]
    pub tenant: String,

    /// Log every broker request and merge fragment.
    #[arg(long, env = "CONTEXT_BROKER_CLIENT_DEBUG")]
    pub broker_debug: bool,

    /// Provider location id.
    #[arg(long, env = "LS_LOCATION")]
    pub location: String,

    /// Provider API key.
    #[arg(long, env = "LS_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Provider base URL.
    #[arg(long, env = "LS_BASE_URL", default_value = DEFAULT_PROVIDER_URL)]
    pub provider_url: String,

    /// Entity id format for exercise trails; empty disables the type.
    #[arg(long, env = "NGSI_TRAILID_FORMAT", default_value = "%s")]
    pub trail_id_format: String,

    /// Entity id format for sports fields; empty disables the type.
    #[arg(long, env = "NGSI_SPORTSFIELDID_FORMAT", default_value = "%s")]
    pub sportsfield_id_format: String,

    /// Pause between records, in milliseconds; values below 500 are raised to 500.
    #[arg(long, env = "RECONCILE_DELAY_MS", default_value_t = 1000)]
    pub delay_ms: u64,

    /// Decide what would change without writing to the broker.
    #[arg(long, env = "DRY_RUN")]
    pub dry_run: bool,

    /// Re-read each matched entity from the broker before comparing.
    #[arg(long, env = "REFRESH_FROM_BROKER")]
    pub refresh: bool,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            base_url: self.broker_url.clone(),
            tenant: self.tenant.clone(),
            debug: self.broker_debug,
        }
    }

    fn id_format_for(&self, entity_type: EntityType) -> &str {
        match entity_type {
            EntityType::ExerciseTrail => &self.trail_id_format,
            EntityType::SportsField => &self.sportsfield_id_format,
        }
    }

    /// Configured (format, type) pairs in query order.
    pub fn type_formats(&self) -> Result<Vec<TypeFormat>> {
        let mut formats = Vec::new();
        for &entity_type in EntityType::all() {
            let raw = self.id_format_for(entity_type);
            if raw.is_empty() {
                tracing::info!(entity_type = %entity_type, "no id format configured, type disabled");
                continue;
            }
            let format = IdFormat::parse(raw)
                .with_context(|| format!("invalid id format for {entity_type}"))?;
            tracing::debug!(entity_type = %entity_type, id_format = %format, "type enabled");
            formats.push(TypeFormat::new(format, entity_type));
        }
        Ok(formats)
    }

    /// The configured throttle, never below [`MIN_DELAY`].
    pub fn delay(&self) -> Duration {
        let requested = Duration::from_millis(self.delay_ms);
        if requested < MIN_DELAY {
            tracing::warn!(
                requested_ms = self.delay_ms,
                min_ms = MIN_DELAY.as_millis() as u64,
                "reconcile delay below minimum, using minimum"
            );
            return MIN_DELAY;
        }
        requested
    }

    pub fn pass_config(&self) -> Result<PassConfig> {
        Ok(PassConfig {
            type_formats: self.type_formats()?,
            location: self.location.clone(),
            api_key: self.api_key.clone(),
            options: ReconcileOptions {
                delay: self.delay(),
                dry_run: self.dry_run,
                refresh: self.refresh,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Config {
        let mut args = vec![
            "skidspar",
            "--broker-url",
            "http://broker:8080",
            "--location",
            "sundsvall",
            "--api-key",
            "secret",
        ];
        args.extend_from_slice(extra);
        Config::try_parse_from(args).expect("parse")
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        let pass = config.pass_config().expect("pass config");
        assert_eq!(pass.options.delay, Duration::from_secs(1));
        assert!(!pass.options.dry_run);
        assert_eq!(pass.type_formats.len(), 2);
        assert_eq!(pass.type_formats[0].entity_type, EntityType::ExerciseTrail);
        assert_eq!(pass.type_formats[0].format, IdFormat::identity());
        assert_eq!(config.broker_config().tenant, "default");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn empty_format_disables_type() {
        let config = parse(&["--sportsfield-id-format", ""]);
        let formats = config.type_formats().expect("formats");
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].entity_type, EntityType::ExerciseTrail);
    }

    #[test]
    fn invalid_format_is_an_error() {
        let config = parse(&["--trail-id-format", "%s-%s"]);
        assert!(config.type_formats().is_err());
    }

    #[test]
    fn delay_is_clamped_to_minimum() {
        assert_eq!(parse(&["--delay-ms", "0"]).delay(), MIN_DELAY);
        assert_eq!(parse(&["--delay-ms", "499"]).delay(), MIN_DELAY);
        assert_eq!(parse(&["--delay-ms", "500"]).delay(), MIN_DELAY);
        assert_eq!(
            parse(&["--delay-ms", "2500"]).delay(),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn types_follow_query_order() {
        let config = parse(&[
            "--trail-id-format",
            "urn:ngsi-ld:ExerciseTrail:%s",
            "--sportsfield-id-format",
            "urn:ngsi-ld:SportsField:%s",
        ]);
        let formats = config.type_formats().expect("formats");
        let types: Vec<_> = formats.iter().map(|f| f.entity_type).collect();
        assert_eq!(types, EntityType::all());
        assert_eq!(formats[1].format.to_string(), "urn:ngsi-ld:SportsField:%s");
    }

    #[test]
    fn flags_map_to_options() {
        let config = parse(&[
            "--dry-run",
            "--refresh",
            "--delay-ms",
            "0",
            "--tenant",
            "sundsvall",
            "--broker-debug",
            "--log-format",
            "json",
        ]);
        let pass = config.pass_config().expect("pass config");
        assert!(pass.options.dry_run);
        assert!(pass.options.refresh);
        assert_eq!(pass.options.delay, MIN_DELAY);
        let broker = config.broker_config();
        assert_eq!(broker.tenant, "sundsvall");
        assert!(broker.debug);
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
