//! RFC3339 canonicalization for preparation timestamps.
//!
//! The broker stores `dateLastPreparation` as the exact string we last wrote,
//! so comparisons are byte-for-byte against the canonical form produced here:
//! whole seconds, `Z` for a zero offset and `±hh:mm` otherwise.

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::error::CoreError;

/// Parse an RFC3339 timestamp, keeping its original offset.
pub fn parse_rfc3339(value: &str) -> Result<DateTime<FixedOffset>, CoreError> {
    DateTime::parse_from_rfc3339(value).map_err(|source| CoreError::ParseFailure {
        value: value.to_string(),
        source,
    })
}

/// Re-serialize `value` in canonical RFC3339 form.
///
/// Fractional seconds are dropped.
pub fn canonical_rfc3339(value: &str) -> Result<String, CoreError> {
    let parsed = parse_rfc3339(value)?;
    Ok(parsed.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_is_already_canonical() {
        assert_eq!(
            canonical_rfc3339("2021-12-17T16:54:02Z").unwrap(),
            "2021-12-17T16:54:02Z"
        );
    }

    #[test]
    fn zero_offset_becomes_z() {
        assert_eq!(
            canonical_rfc3339("2021-12-17T16:54:02+00:00").unwrap(),
            "2021-12-17T16:54:02Z"
        );
    }

    #[test]
    fn non_zero_offset_is_preserved() {
        assert_eq!(
            canonical_rfc3339("2022-04-27T06:07:15+02:00").unwrap(),
            "2022-04-27T06:07:15+02:00"
        );
    }

    #[test]
    fn fractional_seconds_are_dropped() {
        assert_eq!(
            canonical_rfc3339("2021-12-17T16:54:02.512Z").unwrap(),
            "2021-12-17T16:54:02Z"
        );
    }

    #[test]
    fn garbage_is_a_parse_failure() {
        let err = canonical_rfc3339("yesterday").unwrap_err();
        assert!(matches!(err, CoreError::ParseFailure { ref value, .. } if value == "yesterday"));
    }

    #[test]
    fn date_without_time_is_rejected() {
        assert!(canonical_rfc3339("2021-12-17").is_err());
    }
}
