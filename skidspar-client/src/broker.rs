//! NGSI-LD context broker client.
//!
//! Wraps the three broker operations a reconciliation pass needs (type
//! listing, entity retrieve, merge-patch) using [`reqwest`]. The
//! [`BrokerClient`] trait is the seam the reconciler is written against.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LINK};
use reqwest::{RequestBuilder, Response, StatusCode};
use skidspar_core::EntityId;

use crate::error::ClientError;
use crate::fragment::Fragment;
use crate::ngsild::{self, EntityDto};

const SOURCE: &str = "context broker";

/// Page size for type listings. Only the first page is read.
pub const LIST_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// One entity from a type listing, reduced to what the directory keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntity {
    pub id: String,
    pub entity_type: String,
    pub status: String,
    pub last_preparation: String,
}

impl From<EntityDto> for ListedEntity {
    fn from(dto: EntityDto) -> Self {
        Self {
            status: dto.status_text(),
            last_preparation: dto.last_preparation_text(),
            id: dto.id,
            entity_type: dto.entity_type,
        }
    }
}

/// The two attributes read back from a single retrieved entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityState {
    pub status: String,
    pub last_preparation: String,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// List entities of `entity_type` (first page only, key-value mode).
    async fn list_entities(&self, entity_type: &str) -> Result<Vec<ListedEntity>, ClientError>;

    /// Read `status` and `dateLastPreparation` of one entity.
    async fn retrieve_entity(&self, entity_id: &EntityId) -> Result<EntityState, ClientError>;

    /// Merge `fragment` into the entity.
    async fn merge_entity(
        &self,
        entity_id: &EntityId,
        fragment: &Fragment,
    ) -> Result<(), ClientError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Connection settings for [`HttpBrokerClient`].
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Base URL, e.g. `http://context-broker:8080`.
    pub base_url: String,
    pub tenant: String,
    /// Log every request and merge body.
    pub debug: bool,
}

impl BrokerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            tenant: ngsild::DEFAULT_TENANT.to_string(),
            debug: false,
        }
    }
}

/// HTTP client for one broker and tenant.
pub struct HttpBrokerClient {
    client: reqwest::Client,
    config: BrokerConfig,
    link: String,
}

impl HttpBrokerClient {
    pub fn new(config: BrokerConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a broker client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, mut config: BrokerConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            client,
            config,
            link: ngsild::link_header(),
        }
    }

    fn entities_url(&self) -> String {
        format!("{}/ngsi-ld/v1/entities", self.config.base_url)
    }

    fn entity_url(&self, entity_id: &EntityId) -> String {
        format!("{}/{}", self.entities_url(), entity_id)
    }

    fn with_tenant(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.tenant == ngsild::DEFAULT_TENANT {
            request
        } else {
            request.header(ngsild::TENANT_HEADER, &self.config.tenant)
        }
    }

    async fn send(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, ClientError> {
        if self.config.debug {
            tracing::info!(method, url, tenant = %self.config.tenant, "broker request");
        }
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::SourceUnavailable {
                source_name: SOURCE,
                source,
            })?;
        if self.config.debug {
            tracing::info!(method, url, status = response.status().as_u16(), "broker response");
        }
        Ok(response)
    }
}

#[async_trait]
impl BrokerClient for HttpBrokerClient {
    async fn list_entities(&self, entity_type: &str) -> Result<Vec<ListedEntity>, ClientError> {
        let url = self.entities_url();
        let limit = LIST_LIMIT.to_string();
        let request = self
            .client
            .get(&url)
            .query(&[
                ("type", entity_type),
                ("limit", limit.as_str()),
                ("options", "keyValues"),
            ])
            .header(LINK, &self.link);
        let response = self.send("GET", &url, self.with_tenant(request)).await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            tracing::error!(
                request = %format!("GET {url}?type={entity_type}&limit={limit}&options=keyValues"),
                tenant = %self.config.tenant,
                response_status = status.as_u16(),
                response_headers = ?response.headers(),
                "request failed"
            );
        }
        let body = read_success_body(response, StatusCode::OK).await?;

        let entities: Vec<EntityDto> =
            serde_json::from_str(&body).map_err(|source| ClientError::MalformedResponse {
                source_name: SOURCE,
                source,
            })?;
        Ok(entities.into_iter().map(ListedEntity::from).collect())
    }

    async fn retrieve_entity(&self, entity_id: &EntityId) -> Result<EntityState, ClientError> {
        let url = self.entity_url(entity_id);
        let request = self
            .client
            .get(&url)
            .header(ACCEPT, ngsild::LD_JSON)
            .header(LINK, &self.link);
        let response = self.send("GET", &url, self.with_tenant(request)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                entity_id: entity_id.to_string(),
            });
        }
        let body = read_success_body(response, StatusCode::OK).await?;

        let entity: EntityDto =
            serde_json::from_str(&body).map_err(|source| ClientError::MalformedResponse {
                source_name: SOURCE,
                source,
            })?;
        Ok(EntityState {
            status: entity.status_text(),
            last_preparation: entity.last_preparation_text(),
        })
    }

    async fn merge_entity(
        &self,
        entity_id: &EntityId,
        fragment: &Fragment,
    ) -> Result<(), ClientError> {
        let url = self.entity_url(entity_id);
        if self.config.debug {
            tracing::info!(entity_id = %entity_id, fragment = ?fragment, "merge fragment");
        }

        let request = self
            .client
            .patch(&url)
            .header(CONTENT_TYPE, ngsild::LD_JSON)
            .json(fragment);
        let response = self.send("PATCH", &url, self.with_tenant(request)).await?;

        let status = response.status();
        match status {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound {
                entity_id: entity_id.to_string(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::WriteFailure {
                    entity_id: entity_id.to_string(),
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

/// Read the body of `response`, rejecting any status other than `expected`.
pub(crate) async fn read_success_body(
    response: Response,
    expected: StatusCode,
) -> Result<String, ClientError> {
    read_body_from(SOURCE, response, expected).await
}

pub(crate) async fn read_body_from(
    source_name: &'static str,
    response: Response,
    expected: StatusCode,
) -> Result<String, ClientError> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response
        .text()
        .await
        .map_err(|source| ClientError::SourceUnavailable {
            source_name,
            source,
        })?;

    if status != expected {
        return Err(ClientError::SourceRejected {
            source_name,
            status: status.as_u16(),
            content_type,
            body,
        });
    }
    Ok(body)
}
