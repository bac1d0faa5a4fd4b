//! Document collection served over HTTP.
//!
//! `GET <base>/<collection>` must return a JSON array of location documents
//! (`{"_id", "location", "xy"}`; `id` is accepted in place of `_id`).

use super::traits::LocationStore;
use crate::config::is_valid_collection_name;
use crate::error::{MapCacheError, Result};
use crate::models::MapLocation;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

/// HTTP document store client.
pub struct HttpLocationStore {
    client: Client,
    endpoint: Url,
}

impl HttpLocationStore {
    /// Create a client for `collection` under `base_url`.
    pub fn new(base_url: &str, collection: &str) -> Result<Self> {
        if !is_valid_collection_name(collection) {
            return Err(MapCacheError::Config {
                message: format!("invalid collection name {:?}", collection),
            });
        }

        let mut base = Url::parse(base_url).map_err(|e| MapCacheError::Config {
            message: format!("invalid store URL {:?}: {}", base_url, e),
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(collection).map_err(|e| MapCacheError::Config {
            message: format!("invalid store URL {:?}: {}", base_url, e),
        })?;

        let client = Client::builder()
            .user_agent(concat!("mapcache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MapCacheError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, endpoint })
    }

    /// Fully resolved collection URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl LocationStore for HttpLocationStore {
    async fn find_all(&self) -> Result<Vec<MapLocation>> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;

        let records: Vec<MapLocation> = serde_json::from_slice(&body)
            .map_err(|e| MapCacheError::decode(e, &self.endpoint))?;
        debug!("Fetched {} documents from {}", records.len(), self.endpoint);
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .get(self.endpoint.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("http {}", self.endpoint)
    }
}
