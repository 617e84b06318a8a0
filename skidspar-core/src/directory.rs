//! Per-pass index of stored entity summaries keyed by bare external id.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::types::{ExternalId, StoredEntitySummary};

/// Mapping from bare external id to the broker's last-known summary.
///
/// Built once per pass and read-only afterwards. Insertion is
/// first-seen-wins: a later summary for an id already present is discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: HashMap<ExternalId, StoredEntitySummary>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless `external_id` is already mapped.
    ///
    /// Returns `false` when the summary was discarded.
    pub fn insert_first_seen(
        &mut self,
        external_id: ExternalId,
        summary: StoredEntitySummary,
    ) -> bool {
        match self.entries.entry(external_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(summary);
                true
            }
        }
    }

    pub fn get(&self, external_id: &ExternalId) -> Option<&StoredEntitySummary> {
        self.entries.get(external_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
