//! Provider status feed (längdspår.se routes-status).

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde::Deserialize;
use skidspar_core::{ExternalId, ExternalStatusRecord};

use crate::broker::read_body_from;
use crate::error::ClientError;

const SOURCE: &str = "status provider";

/// Production base URL of the provider.
pub const DEFAULT_PROVIDER_URL: &str = "https://xn--lngdspr-5wao.se";

#[derive(Debug, Deserialize)]
struct StatusFeedDto {
    #[serde(rename = "Ski", default)]
    ski: BTreeMap<String, RouteStatusDto>,
}

/// Every field may be missing or `null`; both read as the zero value.
#[derive(Debug, Deserialize)]
struct RouteStatusDto {
    #[serde(rename = "isActive", default)]
    is_active: Option<bool>,
    #[serde(rename = "externalId", default)]
    external_id: Option<String>,
    #[serde(rename = "lastPreparation", default)]
    last_preparation: Option<String>,
}

/// HTTP client for the provider's routes-status endpoint.
pub struct StatusFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl StatusFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the status feed for `location`.
    ///
    /// Records come back ordered by facility key.
    pub async fn fetch_status(
        &self,
        location: &str,
        api_key: &str,
    ) -> Result<Vec<ExternalStatusRecord>, ClientError> {
        let url = format!(
            "{}/api/locations/{}/routes-status.json",
            self.base_url, location
        );
        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", api_key)])
            .send()
            .await
            .map_err(|source| ClientError::SourceUnavailable {
                source_name: SOURCE,
                source,
            })?;

        let body = read_body_from(SOURCE, response, StatusCode::OK).await?;
        let feed = parse_feed(&body)?;
        tracing::debug!(location, records = feed.len(), "status feed loaded");
        Ok(feed)
    }
}

/// Decode a routes-status document.
pub fn parse_feed(body: &str) -> Result<Vec<ExternalStatusRecord>, ClientError> {
    let feed: StatusFeedDto =
        serde_json::from_str(body).map_err(|source| ClientError::MalformedResponse {
            source_name: SOURCE,
            source,
        })?;

    Ok(feed
        .ski
        .into_iter()
        .map(|(facility_key, route)| ExternalStatusRecord {
            facility_key,
            external_id: ExternalId::from(route.external_id.unwrap_or_default()),
            is_active: route.is_active.unwrap_or_default(),
            last_preparation: route.last_preparation.filter(|p| !p.is_empty()),
        })
        .collect())
}
