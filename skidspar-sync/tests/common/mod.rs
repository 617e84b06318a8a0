//! Shared test helpers: an in-memory broker that records every call.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use skidspar_client::{BrokerClient, ClientError, EntityState, Fragment, ListedEntity};
use skidspar_core::{
    Directory, EntityId, EntityType, ExternalId, ExternalStatusRecord, StoredEntitySummary,
};

/// In-memory [`BrokerClient`] that serves canned listings and records merges.
#[derive(Default)]
pub struct RecordingBroker {
    pub listings: HashMap<String, Vec<ListedEntity>>,
    pub failing_types: Vec<String>,
    pub entities: HashMap<String, EntityState>,
    pub failing_merges: Vec<String>,
    pub merges: Mutex<Vec<(EntityId, Fragment)>>,
    pub list_calls: Mutex<Vec<String>>,
    pub retrieve_calls: Mutex<Vec<EntityId>>,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, entity_type: &str, entities: Vec<ListedEntity>) -> Self {
        self.listings.insert(entity_type.to_string(), entities);
        self
    }

    pub fn failing_listing(mut self, entity_type: &str) -> Self {
        self.failing_types.push(entity_type.to_string());
        self
    }

    pub fn with_entity(mut self, entity_id: &str, status: &str, preparation: &str) -> Self {
        self.entities.insert(
            entity_id.to_string(),
            EntityState {
                status: status.to_string(),
                last_preparation: preparation.to_string(),
            },
        );
        self
    }

    pub fn failing_merge(mut self, entity_id: &str) -> Self {
        self.failing_merges.push(entity_id.to_string());
        self
    }

    pub fn merges(&self) -> Vec<(EntityId, Fragment)> {
        self.merges.lock().unwrap().clone()
    }

    pub fn merge_count(&self) -> usize {
        self.merges.lock().unwrap().len()
    }
}

#[async_trait]
impl BrokerClient for RecordingBroker {
    async fn list_entities(&self, entity_type: &str) -> Result<Vec<ListedEntity>, ClientError> {
        self.list_calls.lock().unwrap().push(entity_type.to_string());
        if self.failing_types.iter().any(|t| t == entity_type) {
            return Err(ClientError::SourceRejected {
                source_name: "context broker",
                status: 500,
                content_type: "text/plain".to_string(),
                body: "listing failed".to_string(),
            });
        }
        Ok(self.listings.get(entity_type).cloned().unwrap_or_default())
    }

    async fn retrieve_entity(&self, entity_id: &EntityId) -> Result<EntityState, ClientError> {
        self.retrieve_calls.lock().unwrap().push(entity_id.clone());
        self.entities
            .get(entity_id.as_str())
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                entity_id: entity_id.to_string(),
            })
    }

    async fn merge_entity(
        &self,
        entity_id: &EntityId,
        fragment: &Fragment,
    ) -> Result<(), ClientError> {
        self.merges
            .lock()
            .unwrap()
            .push((entity_id.clone(), fragment.clone()));
        if self.failing_merges.iter().any(|id| id == entity_id.as_str()) {
            return Err(ClientError::WriteFailure {
                entity_id: entity_id.to_string(),
                status: 400,
                body: "rejected".to_string(),
            });
        }
        Ok(())
    }
}

pub fn listed(id: &str, entity_type: &str, status: &str, preparation: &str) -> ListedEntity {
    ListedEntity {
        id: id.to_string(),
        entity_type: entity_type.to_string(),
        status: status.to_string(),
        last_preparation: preparation.to_string(),
    }
}

pub fn record(
    facility_key: &str,
    external_id: &str,
    is_active: bool,
    preparation: Option<&str>,
) -> ExternalStatusRecord {
    ExternalStatusRecord {
        facility_key: facility_key.to_string(),
        external_id: ExternalId::from(external_id),
        is_active,
        last_preparation: preparation.map(str::to_string),
    }
}

/// Directory with one trail per `(external id, status, preparation)`.
pub fn directory(entries: &[(&str, &str, &str)]) -> Directory {
    let mut directory = Directory::new();
    for (external_id, status, preparation) in entries {
        directory.insert_first_seen(
            ExternalId::from(*external_id),
            StoredEntitySummary {
                entity_id: EntityId(format!("urn:ngsi-ld:ExerciseTrail:{external_id}")),
                entity_type: EntityType::ExerciseTrail,
                status: status.to_string(),
                last_preparation: preparation.to_string(),
            },
        );
    }
    directory
}
