use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::{EndpointMode, SyncConfig};
use crate::errors::{FetchError, FetchErrorKind};
use crate::models::{EntityKey, RawBundle, RawEndpointResult};
use crate::traits::fetcher::EntityFetcher;

/// HTTP fetcher talking to the dashboard backend
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    mode: EndpointMode,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher
    pub fn new(
        base_url: impl Into<String>,
        mode: EndpointMode,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            mode,
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, reqwest::Error> {
        Self::new(&config.api_url, config.endpoint_mode, config.request_timeout)
    }

    pub fn mode(&self) -> EndpointMode {
        self.mode
    }

    /// Full URL of an endpoint, without the query string
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// GET one endpoint for `key` and return its JSON body untouched
    async fn get_json(
        &self,
        key: &EntityKey,
        endpoint: &'static str,
    ) -> Result<RawEndpointResult, FetchError> {
        let response = self
            .client
            .get(self.endpoint_url(endpoint))
            .query(&[(key.kind().query_param(), key.name())])
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(key, endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                key,
                Some(endpoint),
                FetchErrorKind::HttpStatus(status.as_u16()),
            ));
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::from_reqwest(key, endpoint, e))?;

        Ok(RawEndpointResult { endpoint, payload })
    }
}

#[async_trait]
impl EntityFetcher for HttpFetcher {
    async fn fetch(&self, key: &EntityKey) -> Result<RawBundle, FetchError> {
        let kind = key.kind();

        match self.mode {
            EndpointMode::Consolidated => {
                let endpoint = kind.consolidated_endpoint();
                let result = self.get_json(key, endpoint).await?;
                RawBundle::from_consolidated(kind, result.payload).map_err(|e| {
                    FetchError::new(key, Some(endpoint), FetchErrorKind::Decode(e.to_string()))
                })
            }
            EndpointMode::PerEndpoint => {
                // All requests in flight at once; the first failure fails the bundle
                let results =
                    try_join_all(kind.endpoints().iter().copied().map(|ep| self.get_json(key, ep)))
                        .await?;
                debug!("Fetched {} endpoints for {}", results.len(), key);

                RawBundle::from_endpoint_results(kind, results)
                    .map_err(|e| FetchError::new(key, None, FetchErrorKind::Decode(e.to_string())))
            }
        }
    }
}
