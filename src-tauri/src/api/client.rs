//! HTTP client for the Shoprocket REST API.
//!
//! Wraps `reqwest` with the store's `x-api-key` authentication and typed
//! response decoding. Non-2xx responses and envelopes whose `status` is not
//! 200 are surfaced as errors so callers never see half-valid data.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::types::{
    Envelope, OrderPage, OrderRecord, StatsPayload, StatsRange, StatsSnapshot, StoreDetails,
    Subscription,
};
use super::StoreGateway;
use crate::config::SyncConfig;
use crate::settings::ApiKey;

const API_KEY_HEADER: &str = "x-api-key";

pub struct ShoprocketClient {
    client: Client,
    base_url: Url,
}

impl ShoprocketClient {
    pub fn new(config: &SyncConfig) -> Result<Self, ApiError> {
        Self::with_base_url(&config.api_base_url, config.request_timeout)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("shoprocket-tray/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Exactly one trailing slash so relative joins append to the path.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|_| ApiError::BaseUrl(base_url.into()))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|_| ApiError::BaseUrl(format!("{}{path}", self.base_url)))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        api_key: &ApiKey,
        url: Url,
        context: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, api_key.as_str())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|source| ApiError::Deserialize {
                context: context.to_string(),
                source,
            })?;

        match envelope.status {
            Some(code) if code != 200 => Err(ApiError::Api { status: code }),
            _ => Ok(envelope.data),
        }
    }
}

#[async_trait]
impl StoreGateway for ShoprocketClient {
    async fn store_details(&self, api_key: &ApiKey) -> Result<StoreDetails, ApiError> {
        let url = self.endpoint("v1/store/details")?;
        self.get(api_key, url, "store details").await
    }

    async fn subscription(&self, api_key: &ApiKey) -> Result<Subscription, ApiError> {
        let url = self.endpoint("v1/subscription")?;
        self.get(api_key, url, "subscription").await
    }

    async fn stats(&self, api_key: &ApiKey, range: StatsRange) -> Result<StatsSnapshot, ApiError> {
        let mut url = self.endpoint("v1/store/stats")?;
        url.query_pairs_mut().extend_pairs(range.query());

        let payload: StatsPayload = self.get(api_key, url, "store stats").await?;
        Ok(payload.into())
    }

    async fn orders(&self, api_key: &ApiKey, page: OrderPage) -> Result<Vec<OrderRecord>, ApiError> {
        let mut url = self.endpoint("v1/orders")?;
        url.query_pairs_mut()
            .append_pair("limit", &page.limit.to_string())
            .append_pair("page", &page.page.to_string());

        self.get(api_key, url, "orders").await
    }
}
