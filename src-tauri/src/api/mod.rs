pub mod client;
pub mod error;
pub mod types;

pub use client::ShoprocketClient;
pub use error::ApiError;
pub use types::{
    Amount, OrderPage, OrderRecord, SalesPoint, StatsRange, StatsSnapshot, StoreDetails,
    Subscription,
};

use async_trait::async_trait;

use crate::settings::ApiKey;

/// Authenticated access to the store resources the tray displays.
///
/// Every call takes the credential of the current run explicitly, so a
/// poller armed with an old key can never pick up a new one mid-flight.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn store_details(&self, api_key: &ApiKey) -> Result<StoreDetails, ApiError>;

    async fn subscription(&self, api_key: &ApiKey) -> Result<Subscription, ApiError>;

    async fn stats(&self, api_key: &ApiKey, range: StatsRange) -> Result<StatsSnapshot, ApiError>;

    async fn orders(&self, api_key: &ApiKey, page: OrderPage) -> Result<Vec<OrderRecord>, ApiError>;
}
