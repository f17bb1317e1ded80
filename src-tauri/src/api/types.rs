use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Monetary value exactly as the API sent it. The API is inconsistent about
/// quoting decimals, and change detection compares the wire value, so
/// `"100.00"` and `100` are different amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Text(value) => f.write_str(value),
            Amount::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Amount::Text(value.to_string())
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount::Number(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDetails {
    pub store_name: String,
    #[serde(default)]
    pub store_logo: Option<String>,
    #[serde(default)]
    pub store_environment: Option<String>,
    #[serde(default)]
    pub store_id: serde_json::Value,
    #[serde(default)]
    pub default_currency_symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesPoint {
    pub dt: String,
    pub total_amount: Amount,
    pub total_orders: u64,
}

/// One stats fetch. Replaced wholesale every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub revenue: Amount,
    pub orders: u64,
    pub visitors: u64,
    pub abandoned: u64,
    pub sales: Vec<SalesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Public order reference shown to merchants; the change-detection key.
    pub order_id: String,
    /// Internal record id.
    pub id: serde_json::Value,
    pub created_at: String,
    pub total_amount: Amount,
    pub currency_paid_in_symbol: String,
    pub email: String,
    pub is_unread: bool,
}

/// Inclusive date window for the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl StatsRange {
    pub fn trailing_days(today: NaiveDate, days: i64) -> Self {
        Self {
            from: today - Duration::days(days),
            to: today,
        }
    }

    pub fn query(&self) -> [(&'static str, String); 2] {
        [
            ("from", self.from.format("%Y-%m-%d").to_string()),
            ("to", self.to.format("%Y-%m-%d").to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPage {
    pub limit: u32,
    pub page: u32,
}

impl OrderPage {
    pub fn first(limit: u32) -> Self {
        Self { limit, page: 0 }
    }
}

// Wire envelopes, unwrapped by the client.

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub status: Option<u16>,
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsPayload {
    pub stats: StatsTotals,
    pub graphs: StatsGraphs,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsTotals {
    pub revenue: Amount,
    #[serde(default)]
    pub orders: u64,
    #[serde(default)]
    pub visitors: u64,
    #[serde(default)]
    pub abandoned: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsGraphs {
    #[serde(default)]
    pub sales: Vec<SalesPoint>,
}

impl From<StatsPayload> for StatsSnapshot {
    fn from(payload: StatsPayload) -> Self {
        Self {
            revenue: payload.stats.revenue,
            orders: payload.stats.orders,
            visitors: payload.stats.visitors,
            abandoned: payload.stats.abandoned,
            sales: payload.graphs.sales,
        }
    }
}
