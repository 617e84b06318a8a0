//! Directory construction from per-type broker listings.

use skidspar_client::BrokerClient;
use skidspar_core::{Directory, StoredEntitySummary, TypeFormat};

use crate::error::SyncError;

/// List every configured entity type and index the results by bare id.
///
/// Types are queried in `formats` order; when two types share a bare id the
/// entity of the type queried first is kept. Any listing failure aborts the
/// build and no partial directory is returned.
pub async fn build_directory(
    broker: &dyn BrokerClient,
    formats: &[TypeFormat],
) -> Result<Directory, SyncError> {
    let mut directory = Directory::new();

    for type_format in formats {
        let entity_type = type_format.entity_type;
        let listed = broker
            .list_entities(entity_type.as_str())
            .await
            .map_err(|source| SyncError::Directory {
                entity_type,
                source,
            })?;

        let listed_count = listed.len();
        for entity in listed {
            let bare_id = type_format.format.bare_id(&entity.id);
            let summary = StoredEntitySummary {
                entity_id: entity.id.into(),
                entity_type,
                status: entity.status,
                last_preparation: entity.last_preparation,
            };
            if !directory.insert_first_seen(bare_id.clone(), summary) {
                tracing::debug!(
                    external_id = %bare_id,
                    entity_type = %entity_type,
                    "id already mapped by an earlier type, keeping first"
                );
            }
        }

        tracing::info!(
            entity_type = %entity_type,
            listed = listed_count,
            directory_size = directory.len(),
            "stored entity ids"
        );
    }

    Ok(directory)
}
