use serde::Serialize;
use serde_json::{json, Value};

use crate::api::{OrderRecord, SalesPoint, StatsSnapshot, StoreDetails, Subscription};

/// One-way pushes to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ShowSettings,
    StoreDetails {
        store_details: Option<StoreDetails>,
        subscription: Option<Subscription>,
    },
    DisplayStats(StatsSnapshot),
    DrawChart(Vec<SalesPoint>),
    DisplayOrders(Vec<OrderRecord>),
    AppVersion(String),
    /// Text next to the tray icon (macOS menu bar).
    TrayTitle(String),
    GetOrdersError(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreDetailsPayload<'a> {
    store_details: &'a Option<StoreDetails>,
    subscription: &'a Option<Subscription>,
}

impl UiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::ShowSettings => "show-settings",
            UiEvent::StoreDetails { .. } => "store-details",
            UiEvent::DisplayStats(_) => "display-stats",
            UiEvent::DrawChart(_) => "draw-chart",
            UiEvent::DisplayOrders(_) => "display-orders",
            UiEvent::AppVersion(_) => "app-version",
            UiEvent::TrayTitle(_) => "tray-title",
            UiEvent::GetOrdersError(_) => "get-orders-error",
        }
    }

    pub fn payload(&self) -> Value {
        let encoded = match self {
            UiEvent::ShowSettings => Ok(Value::Null),
            UiEvent::StoreDetails {
                store_details,
                subscription,
            } => serde_json::to_value(StoreDetailsPayload {
                store_details,
                subscription,
            }),
            UiEvent::DisplayStats(stats) => serde_json::to_value(stats),
            UiEvent::DrawChart(sales) => serde_json::to_value(sales),
            UiEvent::DisplayOrders(orders) => serde_json::to_value(orders),
            UiEvent::AppVersion(version) => Ok(json!(version)),
            UiEvent::TrayTitle(title) => Ok(json!(title)),
            UiEvent::GetOrdersError(message) => Ok(json!(message)),
        };

        encoded.unwrap_or_else(|err| {
            log::error!("Failed to encode {} payload: {err}", self.name());
            Value::Null
        })
    }
}

/// Presentation layer sink. Fire-and-forget: implementations log their own
/// delivery failures.
pub trait Presenter: Send + Sync {
    fn emit(&self, event: UiEvent);
}

/// Presenter for headless runs; renders each push as a log line.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn emit(&self, event: UiEvent) {
        match &event {
            UiEvent::ShowSettings => {
                log::warn!("API key is not set; set SHOPROCKET_API_KEY or submit one in settings")
            }
            UiEvent::StoreDetails {
                store_details,
                subscription,
            } => log::info!(
                "Store: {} ({})",
                store_details
                    .as_ref()
                    .map_or("unknown", |details| details.store_name.as_str()),
                subscription
                    .as_ref()
                    .map_or("no subscription", |plan| plan.name.as_str()),
            ),
            UiEvent::DisplayStats(stats) => log::info!(
                "Revenue {} from {} orders, {} visitors, {} abandoned",
                stats.revenue,
                stats.orders,
                stats.visitors,
                stats.abandoned
            ),
            UiEvent::DisplayOrders(orders) => {
                if let Some(latest) = orders.first() {
                    log::info!(
                        "{} recent orders; latest {} {}{} from {}",
                        orders.len(),
                        latest.order_id,
                        latest.currency_paid_in_symbol,
                        latest.total_amount,
                        latest.email
                    );
                }
            }
            UiEvent::GetOrdersError(message) => log::error!("{message}"),
            _ => log::debug!("{} {}", event.name(), event.payload()),
        }
    }
}
