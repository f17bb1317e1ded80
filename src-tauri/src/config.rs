use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.shoprocket.io/";

const DEFAULT_POLL_SECS: u64 = 10;
const DEFAULT_STATS_WINDOW_DAYS: i64 = 7;
const DEFAULT_ORDERS_PAGE_SIZE: u32 = 100;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime knobs for the sync loop. Cadence is configuration, not a constant:
/// some deployments poll stats every ten minutes instead of every ten seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub api_base_url: String,
    pub stats_interval: Duration,
    pub orders_interval: Duration,
    pub stats_window_days: i64,
    pub orders_page_size: u32,
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            stats_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            orders_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            stats_window_days: DEFAULT_STATS_WINDOW_DAYS,
            orders_page_size: DEFAULT_ORDERS_PAGE_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_base_url = lookup("SHOPROCKET_API_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.api_base_url);

        Self {
            api_base_url,
            stats_interval: secs_var(
                &lookup,
                "SHOPROCKET_STATS_INTERVAL_SECS",
                defaults.stats_interval,
            ),
            orders_interval: secs_var(
                &lookup,
                "SHOPROCKET_ORDERS_INTERVAL_SECS",
                defaults.orders_interval,
            ),
            ..defaults
        }
    }
}

fn secs_var(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: Duration) -> Duration {
    let Some(raw) = lookup(name) else {
        return default;
    };

    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            log::warn!("Ignoring invalid {name}={raw:?}; using {}s", default.as_secs());
            default
        }
    }
}
