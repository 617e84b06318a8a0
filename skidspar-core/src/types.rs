//! Domain types for facility status reconciliation.
//!
//! Feed-side values ([`ExternalStatusRecord`]) and broker-side values
//! ([`StoredEntitySummary`]) keep the raw strings each source reported;
//! interpretation happens in the reconciler.

use std::fmt;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Bare facility identifier shared by the provider feed and the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalId(pub String);

impl ExternalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ExternalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Fully qualified broker entity identifier (prefix + external id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Operational status of a facility as written to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacilityStatus {
    Open,
    Closed,
}

impl FacilityStatus {
    /// Map the provider's `isActive` flag onto the status domain.
    pub fn from_active(is_active: bool) -> Self {
        if is_active {
            FacilityStatus::Open
        } else {
            FacilityStatus::Closed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityStatus::Open => "open",
            FacilityStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for FacilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NGSI-LD entity types that carry facility status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    ExerciseTrail,
    SportsField,
}

impl EntityType {
    /// All supported types in directory query order.
    pub fn all() -> &'static [EntityType] {
        &[EntityType::ExerciseTrail, EntityType::SportsField]
    }

    /// The type name as used in broker queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::ExerciseTrail => "ExerciseTrail",
            EntityType::SportsField => "SportsField",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Id formats
// ---------------------------------------------------------------------------

/// An entity id format such as `urn:ngsi-ld:ExerciseTrail:se:sundsvall:facilities:%s`.
///
/// The text before `%s` is the broker-side namespace prefix, the text after it
/// a suffix. A format without `%s` is a bare prefix; `%s` alone is the
/// identity format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdFormat {
    prefix: String,
    suffix: String,
}

impl IdFormat {
    pub fn parse(format: &str) -> Result<Self, CoreError> {
        match format.split_once("%s") {
            Some((prefix, suffix)) => {
                if suffix.contains("%s") {
                    return Err(CoreError::InvalidIdFormat {
                        format: format.to_string(),
                    });
                }
                Ok(Self {
                    prefix: prefix.to_string(),
                    suffix: suffix.to_string(),
                })
            }
            None => Ok(Self {
                prefix: format.to_string(),
                suffix: String::new(),
            }),
        }
    }

    pub fn identity() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
        }
    }

    /// Strip the namespace from a broker entity id.
    ///
    /// Ids that do not carry the prefix are returned whole.
    pub fn bare_id(&self, entity_id: &str) -> ExternalId {
        let rest = entity_id.strip_prefix(&self.prefix).unwrap_or(entity_id);
        let rest = if self.suffix.is_empty() {
            rest
        } else {
            rest.strip_suffix(&self.suffix).unwrap_or(rest)
        };
        ExternalId::from(rest)
    }
}

impl Default for IdFormat {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for IdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%s{}", self.prefix, self.suffix)
    }
}

/// One configured (id format, entity type) pair for directory construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFormat {
    pub format: IdFormat,
    pub entity_type: EntityType,
}

impl TypeFormat {
    pub fn new(format: IdFormat, entity_type: EntityType) -> Self {
        Self {
            format,
            entity_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One facility as reported by the provider feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalStatusRecord {
    /// Provider-internal key; used for logging and ordering only.
    pub facility_key: String,
    pub external_id: ExternalId,
    pub is_active: bool,
    /// Raw RFC3339 value; `None` when the feed reported no preparation.
    pub last_preparation: Option<String>,
}

impl ExternalStatusRecord {
    pub fn current_status(&self) -> FacilityStatus {
        FacilityStatus::from_active(self.is_active)
    }
}

/// The broker's last-known view of one facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntitySummary {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    /// Last known status, empty if never set.
    pub status: String,
    /// Last known `dateLastPreparation`, empty if never set.
    pub last_preparation: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_active_flag() {
        assert_eq!(FacilityStatus::from_active(true), FacilityStatus::Open);
        assert_eq!(FacilityStatus::from_active(false), FacilityStatus::Closed);
        assert_eq!(FacilityStatus::Closed.to_string(), "closed");
    }

    #[test]
    fn entity_type_display() {
        assert_eq!(EntityType::ExerciseTrail.to_string(), "ExerciseTrail");
        assert_eq!(EntityType::SportsField.as_str(), "SportsField");
    }

    #[test]
    fn query_order_is_trails_first() {
        assert_eq!(
            EntityType::all(),
            &[EntityType::ExerciseTrail, EntityType::SportsField]
        );
    }

    #[test]
    fn identity_format_keeps_ids() {
        let format = IdFormat::parse("%s").unwrap();
        assert_eq!(format, IdFormat::identity());
        assert_eq!(format.bare_id("650"), ExternalId::from("650"));
        assert_eq!(format.to_string(), "%s");
    }

    #[test]
    fn prefixed_format_strips_namespace() {
        let format = IdFormat::parse("urn:ngsi-ld:ExerciseTrail:se:sundsvall:facilities:%s").unwrap();
        assert_eq!(
            format.bare_id("urn:ngsi-ld:ExerciseTrail:se:sundsvall:facilities:650"),
            ExternalId::from("650")
        );
    }

    #[test]
    fn format_without_placeholder_is_a_prefix() {
        let format = IdFormat::parse("urn:ngsi-ld:SportsField:").unwrap();
        assert_eq!(format.to_string(), "urn:ngsi-ld:SportsField:%s");
        assert_eq!(
            format.bare_id("urn:ngsi-ld:SportsField:796"),
            ExternalId::from("796")
        );
    }

    #[test]
    fn id_without_prefix_is_kept_whole() {
        let format = IdFormat::parse("urn:ngsi-ld:SportsField:%s").unwrap();
        assert_eq!(
            format.bare_id("urn:ngsi-ld:ExerciseTrail:650"),
            ExternalId::from("urn:ngsi-ld:ExerciseTrail:650")
        );
    }

    #[test]
    fn suffix_is_stripped_too() {
        let format = IdFormat::parse("trail-%s-v1").unwrap();
        assert_eq!(format.bare_id("trail-12-v1"), ExternalId::from("12"));
        assert_eq!(format.to_string(), "trail-%s-v1");
    }

    #[test]
    fn two_placeholders_rejected() {
        let err = IdFormat::parse("%s:%s").unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdFormat { .. }));
    }

    #[test]
    fn record_current_status() {
        let record = ExternalStatusRecord {
            facility_key: "Kallaspåret:123".to_string(),
            external_id: ExternalId::from("123"),
            is_active: false,
            last_preparation: None,
        };
        assert_eq!(record.current_status(), FacilityStatus::Closed);
    }
}
