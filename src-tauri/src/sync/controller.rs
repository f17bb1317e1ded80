use std::{
    future::Future,
    sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tokio::{
    sync::Mutex,
    task::{JoinHandle, JoinSet},
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    api::{ApiError, OrderPage, OrderRecord, StatsRange, StatsSnapshot, StoreGateway},
    config::SyncConfig,
    events::{Presenter, UiEvent},
    settings::{ApiKey, SettingsStore},
};

use super::notify::NotificationEmitter;
use super::state::{HeadOrderCell, OrdersChange, RevenueCell};

// Set to false to silence the per-tick logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const API_KEY_SAVED: &str = "API Key saved successfully!";
pub const ORDERS_FAILED: &str = "An error occurred while fetching orders. Please try again later";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No usable credential; settings were requested and nothing polls.
    NeedsCredential,
    Polling,
}

/// The running pair of poll loops. Aborting a loop also aborts its
/// in-flight ticks, since they live in the loop's `JoinSet`.
struct Pollers {
    stats: JoinHandle<()>,
    orders: JoinHandle<()>,
}

impl Pollers {
    fn abort(self) {
        self.stats.abort();
        self.orders.abort();
    }
}

/// Comparison state plus the sequence number of the newest tick applied to
/// it. Ticks can finish out of order; an older result never overwrites a
/// newer one.
struct Sequenced<C> {
    applied: u64,
    cell: C,
}

impl<C> Sequenced<C> {
    /// Bootstrap seeds at 0; poller ticks count up from 1.
    fn seeded(cell: C) -> Self {
        Self { applied: 0, cell }
    }

    fn admit(&mut self, seq: u64) -> bool {
        if seq < self.applied {
            return false;
        }
        self.applied = seq;
        true
    }
}

/// Everything one bootstrap needs to fetch, diff and push. Built fresh on
/// every bootstrap so pollers never see a credential other than their own.
struct Pipeline {
    gateway: Arc<dyn StoreGateway>,
    presenter: Arc<dyn Presenter>,
    notifications: NotificationEmitter,
    settings: Arc<SettingsStore>,
    api_key: ApiKey,
    config: SyncConfig,
}

#[derive(Clone)]
pub struct SyncController {
    gateway: Arc<dyn StoreGateway>,
    presenter: Arc<dyn Presenter>,
    notifications: NotificationEmitter,
    settings: Arc<SettingsStore>,
    config: SyncConfig,
    pollers: Arc<Mutex<Option<Pollers>>>,
}

impl SyncController {
    pub fn new(
        gateway: Arc<dyn StoreGateway>,
        presenter: Arc<dyn Presenter>,
        notifications: NotificationEmitter,
        settings: Arc<SettingsStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            gateway,
            presenter,
            notifications,
            settings,
            config,
            pollers: Arc::new(Mutex::new(None)),
        }
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn notifications(&self) -> &NotificationEmitter {
        &self.notifications
    }

    /// Credential check, one-time fetches, then arm the pollers. Any pollers
    /// from an earlier bootstrap are aborted first, so at most one pair runs.
    ///
    /// The poller lock is held for the whole run, including the seeding
    /// fetches. Concurrent bootstraps, `set_api_key` and `is_polling` wait
    /// for it, so two runs never interleave their pushes.
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        let mut pollers = self.pollers.lock().await;
        if let Some(previous) = pollers.take() {
            log_info!("Stopping pollers from the previous bootstrap");
            previous.abort();
        }

        let Some(api_key) = self.settings.credential() else {
            log_warn!("API key is not set; showing settings");
            self.presenter.emit(UiEvent::ShowSettings);
            return BootstrapOutcome::NeedsCredential;
        };

        log_info!("Loading store data...");
        let pipeline = Arc::new(Pipeline {
            gateway: Arc::clone(&self.gateway),
            presenter: Arc::clone(&self.presenter),
            notifications: self.notifications.clone(),
            settings: Arc::clone(&self.settings),
            api_key,
            config: self.config.clone(),
        });

        pipeline.push_store_details().await;

        let mut revenue = RevenueCell::new();
        match pipeline.fetch_stats().await {
            Ok(stats) => {
                pipeline.apply_stats(&mut revenue, stats);
            }
            Err(err) => log_warn!("Initial stats fetch failed; no revenue baseline: {err}"),
        }

        let mut head = HeadOrderCell::new();
        match pipeline.fetch_orders().await {
            Ok(orders) => {
                pipeline.apply_orders(&mut head, orders);
            }
            Err(err) => log_warn!("Initial orders fetch failed; no order baseline: {err}"),
        }

        let stats = spawn_poller(
            Arc::clone(&pipeline),
            self.config.stats_interval,
            revenue,
            |pipeline, cell, seq| async move { pipeline.stats_tick(&cell, seq).await },
        );
        let orders = spawn_poller(
            pipeline,
            self.config.orders_interval,
            head,
            |pipeline, cell, seq| async move { pipeline.orders_tick(&cell, seq).await },
        );
        *pollers = Some(Pollers { stats, orders });

        log_info!(
            "Polling stats every {}s and orders every {}s",
            self.config.stats_interval.as_secs(),
            self.config.orders_interval.as_secs()
        );
        BootstrapOutcome::Polling
    }

    /// Store the new credential, then restart from a clean bootstrap.
    pub async fn set_api_key(&self, api_key: String) -> Result<&'static str> {
        self.settings
            .update_api_key(api_key)
            .context("failed to save API key")?;
        self.bootstrap().await;
        Ok(API_KEY_SAVED)
    }

    /// On-demand refetch for the orders view. Always pushes the list and
    /// leaves the poller's comparison state alone.
    pub async fn refresh_orders(&self) -> Result<Vec<OrderRecord>> {
        log_info!("Fetching orders...");
        let result = match self.settings.credential() {
            Some(api_key) => self
                .gateway
                .orders(&api_key, OrderPage::first(self.config.orders_page_size))
                .await
                .map_err(anyhow::Error::from),
            None => Err(anyhow!("API key is not set")),
        };

        match result {
            Ok(orders) => {
                self.presenter.emit(UiEvent::DisplayOrders(orders.clone()));
                Ok(orders)
            }
            Err(err) => {
                log_error!("On-demand orders fetch failed: {err:#}");
                self.presenter
                    .emit(UiEvent::GetOrdersError(ORDERS_FAILED.to_string()));
                Err(err.context("failed to fetch orders"))
            }
        }
    }

    pub async fn is_polling(&self) -> bool {
        self.pollers.lock().await.is_some()
    }
}

impl Pipeline {
    async fn push_store_details(&self) {
        let store_details = match self.gateway.store_details(&self.api_key).await {
            Ok(details) => Some(details),
            Err(err) => {
                log_error!("Failed to fetch store details: {err}");
                None
            }
        };
        let subscription = match self.gateway.subscription(&self.api_key).await {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                log_error!("Failed to fetch subscription: {err}");
                None
            }
        };

        self.presenter.emit(UiEvent::StoreDetails {
            store_details,
            subscription,
        });
    }

    async fn fetch_stats(&self) -> Result<StatsSnapshot, ApiError> {
        let range = StatsRange::trailing_days(Utc::now().date_naive(), self.config.stats_window_days);
        self.gateway.stats(&self.api_key, range).await
    }

    async fn fetch_orders(&self) -> Result<Vec<OrderRecord>, ApiError> {
        self.gateway
            .orders(&self.api_key, OrderPage::first(self.config.orders_page_size))
            .await
    }

    fn apply_stats(&self, cell: &mut RevenueCell, stats: StatsSnapshot) -> bool {
        if !cell.observe(&stats.revenue) {
            return false;
        }

        self.presenter.emit(UiEvent::TrayTitle(stats.revenue.to_string()));
        self.presenter.emit(UiEvent::DrawChart(stats.sales.clone()));
        self.presenter.emit(UiEvent::DisplayStats(stats));
        true
    }

    fn apply_orders(&self, cell: &mut HeadOrderCell, orders: Vec<OrderRecord>) -> OrdersChange {
        let change = cell.observe(&orders);

        if change == OrdersChange::NewHead {
            if self.settings.notifications_enabled() {
                self.notifications.notify_new_order();
            } else {
                log_info!("New order arrived; notifications are disabled");
            }
        }
        if change.should_push() {
            self.presenter.emit(UiEvent::DisplayOrders(orders));
        }

        change
    }

    async fn stats_tick(&self, cell: &StdMutex<Sequenced<RevenueCell>>, seq: u64) {
        match self.fetch_stats().await {
            Ok(stats) => {
                let mut state = lock(cell);
                if !state.admit(seq) {
                    log_info!("Dropping stats from tick {seq}; a newer tick already applied");
                    return;
                }
                if self.apply_stats(&mut state.cell, stats) {
                    log_info!("Revenue changed; stats pushed");
                }
            }
            Err(err) => log_warn!("Stats poll failed: {err}"),
        }
    }

    async fn orders_tick(&self, cell: &StdMutex<Sequenced<HeadOrderCell>>, seq: u64) {
        match self.fetch_orders().await {
            Ok(orders) => {
                let mut state = lock(cell);
                if !state.admit(seq) {
                    log_info!("Dropping orders from tick {seq}; a newer tick already applied");
                    return;
                }
                if self.apply_orders(&mut state.cell, orders) == OrdersChange::NewHead {
                    log_info!("New order detected");
                }
            }
            Err(err) => log_warn!("Orders poll failed: {err}"),
        }
    }
}

fn lock<T>(cell: &StdMutex<T>) -> MutexGuard<'_, T> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fixed-cadence loop; the first tick is one full period after arming.
/// Each tick runs as its own task so a hung fetch never holds back the
/// next one, and carries its sequence number so late results are dropped.
fn spawn_poller<C, F, Fut>(
    pipeline: Arc<Pipeline>,
    period: Duration,
    cell: C,
    tick: F,
) -> JoinHandle<()>
where
    C: Send + 'static,
    F: Fn(Arc<Pipeline>, Arc<StdMutex<Sequenced<C>>>, u64) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let cell = Arc::new(StdMutex::new(Sequenced::seeded(cell)));

    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = JoinSet::new();
        let mut seq: u64 = 0;

        loop {
            ticker.tick().await;
            while in_flight.try_join_next().is_some() {}
            seq += 1;
            in_flight.spawn(tick(Arc::clone(&pipeline), Arc::clone(&cell), seq));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Amount, StoreDetails, Subscription};
    use crate::sync::notify::{ClickAction, Notifier, OrderAlert, WindowRequests};
    use crate::sync::state::order;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    const TICK: Duration = Duration::from_secs(10);

    /// Scripted gateway. Each queue yields its entries in order and then
    /// repeats the last one; `None` is a failed fetch.
    #[derive(Default)]
    struct FakeGateway {
        stats: StdMutex<VecDeque<Option<StatsSnapshot>>>,
        orders: StdMutex<VecDeque<Option<Vec<OrderRecord>>>>,
        fail_store_details: bool,
        stall_stats_call: Option<usize>,
        slow_orders_call: Option<(usize, Duration)>,
        calls: StdMutex<Vec<String>>,
    }

    impl FakeGateway {
        fn with_stats(self, script: &[Option<u64>]) -> Self {
            *self.stats.lock().unwrap() = script.iter().map(|rev| rev.map(stats)).collect();
            self
        }

        fn with_order_lists(self, script: &[&[&str]]) -> Self {
            *self.orders.lock().unwrap() = script
                .iter()
                .map(|ids| Some(ids.iter().map(|id| order(id)).collect()))
                .collect();
            self
        }

        fn with_orders(self, script: &[Option<&str>]) -> Self {
            *self.orders.lock().unwrap() = script
                .iter()
                .map(|head| head.map(|id| vec![order(id), order("older")]))
                .collect();
            self
        }

        fn record(&self, call: String) -> usize {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len()
        }

        fn calls_matching(&self, prefix: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|call| call.starts_with(prefix))
                .count()
        }

        fn next<T: Clone>(queue: &StdMutex<VecDeque<Option<T>>>) -> Result<T, ApiError> {
            let mut queue = queue.lock().unwrap();
            let entry = if queue.len() > 1 {
                queue.pop_front().flatten()
            } else {
                queue.front().cloned().flatten()
            };
            entry.ok_or(ApiError::Status(503))
        }
    }

    #[async_trait]
    impl StoreGateway for FakeGateway {
        async fn store_details(&self, api_key: &ApiKey) -> Result<StoreDetails, ApiError> {
            self.record(format!("details:{}", api_key.as_str()));
            if self.fail_store_details {
                return Err(ApiError::Status(500));
            }
            Ok(StoreDetails {
                store_name: "Rocket Socks".into(),
                store_logo: None,
                store_environment: Some("live".into()),
                store_id: serde_json::json!(42),
                default_currency_symbol: Some("£".into()),
            })
        }

        async fn subscription(&self, api_key: &ApiKey) -> Result<Subscription, ApiError> {
            self.record(format!("subscription:{}", api_key.as_str()));
            Ok(Subscription {
                name: "Pro".into(),
                status: "active".into(),
            })
        }

        async fn stats(&self, api_key: &ApiKey, _range: StatsRange) -> Result<StatsSnapshot, ApiError> {
            self.record(format!("stats:{}", api_key.as_str()));
            let index = self.calls_matching("stats:") - 1;
            if self.stall_stats_call == Some(index) {
                std::future::pending::<()>().await;
            }
            Self::next(&self.stats)
        }

        async fn orders(&self, api_key: &ApiKey, page: OrderPage) -> Result<Vec<OrderRecord>, ApiError> {
            assert_eq!(page, OrderPage { limit: 100, page: 0 });
            self.record(format!("orders:{}", api_key.as_str()));
            let index = self.calls_matching("orders:") - 1;
            // The response is fixed at request time, then delivered late.
            let response = Self::next(&self.orders);
            if let Some((slow, delay)) = self.slow_orders_call {
                if slow == index {
                    time::sleep(delay).await;
                }
            }
            response
        }
    }

    fn stats(revenue: u64) -> StatsSnapshot {
        StatsSnapshot {
            revenue: Amount::from(revenue),
            orders: 3,
            visitors: 40,
            abandoned: 1,
            sales: Vec::new(),
        }
    }

    #[derive(Default)]
    struct RecordingPresenter {
        events: StdMutex<Vec<UiEvent>>,
    }

    impl RecordingPresenter {
        fn names(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().iter().map(UiEvent::name).collect()
        }

        fn count(&self, name: &str) -> usize {
            self.names().into_iter().filter(|n| *n == name).count()
        }

        fn order_heads(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|event| match event {
                    UiEvent::DisplayOrders(orders) => Some(orders[0].order_id.clone()),
                    _ => None,
                })
                .collect()
        }

        fn last_stats(&self) -> Option<StatsSnapshot> {
            self.events.lock().unwrap().iter().rev().find_map(|event| match event {
                UiEvent::DisplayStats(stats) => Some(stats.clone()),
                _ => None,
            })
        }
    }

    impl Presenter for RecordingPresenter {
        fn emit(&self, event: UiEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        shown: StdMutex<usize>,
    }

    impl CountingNotifier {
        fn shown(&self) -> usize {
            *self.shown.lock().unwrap()
        }
    }

    impl Notifier for CountingNotifier {
        fn show(&self, _alert: &OrderAlert, _on_click: ClickAction) -> anyhow::Result<()> {
            *self.shown.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct Harness {
        controller: SyncController,
        gateway: Arc<FakeGateway>,
        presenter: Arc<RecordingPresenter>,
        notifier: Arc<CountingNotifier>,
        _dir: TempDir,
    }

    fn harness(api_key: Option<&str>, gateway: FakeGateway) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(SettingsStore::new(dir.path().join("settings.json")).unwrap());
        if let Some(key) = api_key {
            settings.update_api_key(key.to_string()).unwrap();
        }

        let gateway = Arc::new(gateway);
        let presenter = Arc::new(RecordingPresenter::default());
        let notifier = Arc::new(CountingNotifier::default());
        let notifications = NotificationEmitter::new(notifier.clone(), WindowRequests::new());

        let controller = SyncController::new(
            gateway.clone(),
            presenter.clone(),
            notifications,
            settings,
            SyncConfig::default(),
        );

        Harness {
            controller,
            gateway,
            presenter,
            notifier,
            _dir: dir,
        }
    }

    /// Let `n` poll periods elapse on the paused clock.
    async fn ticks(n: u32) {
        time::sleep(TICK * n).await;
        time::sleep(Duration::from_millis(500)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn blank_credential_shows_settings_and_never_polls() {
        let h = harness(Some("   "), FakeGateway::default());

        assert_eq!(h.controller.bootstrap().await, BootstrapOutcome::NeedsCredential);
        ticks(6).await;

        assert_eq!(h.presenter.names(), vec!["show-settings"]);
        assert!(h.gateway.calls.lock().unwrap().is_empty());
        assert!(!h.controller.is_polling().await);
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_pushes_details_then_seeds_baselines() {
        let h = harness(
            Some("key-1"),
            FakeGateway::default()
                .with_stats(&[Some(100)])
                .with_orders(&[Some("A1")]),
        );

        assert_eq!(h.controller.bootstrap().await, BootstrapOutcome::Polling);

        assert_eq!(
            h.presenter.names(),
            vec!["store-details", "tray-title", "draw-chart", "display-stats", "display-orders"]
        );
        assert_eq!(h.notifier.shown(), 0);
        assert!(h.controller.is_polling().await);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_store_details_do_not_stop_bootstrap() {
        let mut gateway = FakeGateway::default()
            .with_stats(&[Some(100)])
            .with_orders(&[Some("A1")]);
        gateway.fail_store_details = true;
        let h = harness(Some("key-1"), gateway);

        h.controller.bootstrap().await;

        let events = h.presenter.events.lock().unwrap().clone();
        assert_eq!(
            events[0],
            UiEvent::StoreDetails {
                store_details: None,
                subscription: Some(Subscription {
                    name: "Pro".into(),
                    status: "active".into()
                }),
            }
        );
        assert!(h.controller.is_polling().await);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_push_only_when_revenue_changes() {
        let h = harness(
            Some("key-1"),
            FakeGateway::default()
                .with_stats(&[Some(100), Some(100), Some(150)])
                .with_orders(&[Some("A1")]),
        );
        h.controller.bootstrap().await;
        assert_eq!(h.presenter.count("display-stats"), 1);

        ticks(1).await;
        assert_eq!(h.presenter.count("display-stats"), 1);

        ticks(1).await;
        assert_eq!(h.presenter.count("display-stats"), 2);
        assert_eq!(h.presenter.count("draw-chart"), 2);
        assert_eq!(h.presenter.last_stats().unwrap().revenue, Amount::from(150));

        // 150 repeats from here on.
        ticks(3).await;
        assert_eq!(h.presenter.count("display-stats"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn new_head_order_notifies_once() {
        let h = harness(
            Some("key-1"),
            FakeGateway::default()
                .with_stats(&[Some(100)])
                .with_orders(&[Some("A1"), Some("A2")]),
        );
        h.controller.bootstrap().await;
        assert_eq!(h.presenter.count("display-orders"), 1);

        ticks(1).await;
        assert_eq!(h.notifier.shown(), 1);
        assert_eq!(h.presenter.count("display-orders"), 2);

        ticks(3).await;
        assert_eq!(h.notifier.shown(), 1);
        assert_eq!(h.presenter.count("display-orders"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_notifications_still_push_orders() {
        let h = harness(
            Some("key-1"),
            FakeGateway::default()
                .with_stats(&[Some(100)])
                .with_orders(&[Some("A1"), Some("A2")]),
        );
        h.controller.settings().set_notifications_enabled(false).unwrap();
        h.controller.bootstrap().await;

        ticks(1).await;
        assert_eq!(h.notifier.shown(), 0);
        assert_eq!(h.presenter.count("display-orders"), 2);
    }

    // Assumption: with no baseline (initial fetch failed), the first head seen
    // on a tick is treated as pre-existing; it is displayed but not announced.
    #[tokio::test(start_paused = true)]
    async fn missing_baseline_suppresses_first_notification() {
        let h = harness(
            Some("key-1"),
            FakeGateway::default()
                .with_stats(&[None, Some(100)])
                .with_orders(&[None, Some("A1"), Some("A2")]),
        );
        h.controller.bootstrap().await;
        assert_eq!(h.presenter.count("display-stats"), 0);
        assert_eq!(h.presenter.count("display-orders"), 0);

        ticks(1).await;
        assert_eq!(h.presenter.count("display-stats"), 1);
        assert_eq!(h.presenter.count("display-orders"), 1);
        assert_eq!(h.notifier.shown(), 0);

        ticks(1).await;
        assert_eq!(h.notifier.shown(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_ticks_leave_state_untouched() {
        let h = harness(
            Some("key-1"),
            FakeGateway::default()
                .with_stats(&[Some(100), None, Some(100)])
                .with_orders(&[Some("A1"), None, Some("A1"), Some("A2")]),
        );
        h.controller.bootstrap().await;

        ticks(2).await;
        assert_eq!(h.presenter.count("display-stats"), 1);
        assert_eq!(h.presenter.count("display-orders"), 1);
        assert_eq!(h.notifier.shown(), 0);

        ticks(1).await;
        assert_eq!(h.presenter.count("display-orders"), 2);
        assert_eq!(h.notifier.shown(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_order_list_is_a_no_op() {
        let mut gateway = FakeGateway::default().with_stats(&[Some(100)]);
        *gateway.orders.get_mut().unwrap() = VecDeque::from([Some(Vec::new())]);
        let h = harness(Some("key-1"), gateway);

        h.controller.bootstrap().await;
        ticks(2).await;

        assert_eq!(h.presenter.count("display-orders"), 0);
        assert_eq!(h.notifier.shown(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_fetch_does_not_block_later_ticks() {
        let mut gateway = FakeGateway::default()
            .with_stats(&[Some(100), Some(150)])
            .with_orders(&[Some("A1")]);
        // Call 0 is the bootstrap fetch, call 1 the first tick.
        gateway.stall_stats_call = Some(1);
        let h = harness(Some("key-1"), gateway);
        h.controller.bootstrap().await;

        ticks(2).await;

        assert_eq!(h.gateway.calls_matching("stats:"), 3);
        assert_eq!(h.presenter.count("display-stats"), 2);
        assert_eq!(h.presenter.last_stats().unwrap().revenue, Amount::from(150));
    }

    #[tokio::test(start_paused = true)]
    async fn late_orders_result_does_not_rewind_the_head() {
        let mut gateway = FakeGateway::default()
            .with_stats(&[Some(100)])
            .with_order_lists(&[&["A1"], &["A2", "A1"], &["A3", "A2", "A1"]]);
        // Tick 1 asks at 10s and answers at 25s, after tick 2 (20s).
        gateway.slow_orders_call = Some((1, Duration::from_secs(15)));
        let h = harness(Some("key-1"), gateway);
        h.controller.bootstrap().await;

        ticks(3).await;

        assert_eq!(h.presenter.order_heads(), vec!["A1", "A3"]);
        assert_eq!(h.notifier.shown(), 1);
    }

    #[test]
    fn sequenced_cell_refuses_older_ticks() {
        let mut state = Sequenced::seeded(RevenueCell::new());

        assert!(state.admit(2));
        assert!(!state.admit(1));
        assert!(state.admit(3));
        assert_eq!(state.applied, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn credential_change_restarts_with_a_single_poller_pair() {
        let h = harness(
            Some("key-1"),
            FakeGateway::default()
                .with_stats(&[Some(100)])
                .with_orders(&[Some("A1")]),
        );
        h.controller.bootstrap().await;
        ticks(1).await;
        assert_eq!(h.gateway.calls_matching("stats:key-1"), 2);

        let message = h.controller.set_api_key("key-2".into()).await.unwrap();
        assert_eq!(message, "API Key saved successfully!");
        assert_eq!(h.controller.settings().api_key().as_deref(), Some("key-2"));

        ticks(3).await;

        assert_eq!(h.gateway.calls_matching("stats:key-1"), 2);
        assert_eq!(h.gateway.calls_matching("orders:key-1"), 2);
        // One bootstrap fetch plus exactly one per tick.
        assert_eq!(h.gateway.calls_matching("stats:key-2"), 4);
        assert_eq!(h.gateway.calls_matching("orders:key-2"), 4);
        assert_eq!(h.gateway.calls_matching("details:key-2"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_the_credential_stops_polling() {
        let h = harness(
            Some("key-1"),
            FakeGateway::default()
                .with_stats(&[Some(100)])
                .with_orders(&[Some("A1")]),
        );
        h.controller.bootstrap().await;
        let before = h.gateway.calls.lock().unwrap().len();

        h.controller.set_api_key("".into()).await.unwrap();
        ticks(3).await;

        assert_eq!(h.gateway.calls.lock().unwrap().len(), before);
        assert_eq!(h.presenter.count("show-settings"), 1);
        assert!(!h.controller.is_polling().await);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_orders_pushes_without_moving_the_baseline() {
        let h = harness(
            Some("key-1"),
            FakeGateway::default()
                .with_stats(&[Some(100)])
                .with_orders(&[Some("A1"), Some("A2")]),
        );
        h.controller.bootstrap().await;

        let orders = h.controller.refresh_orders().await.unwrap();
        assert_eq!(orders[0].order_id, "A2");
        assert_eq!(h.presenter.count("display-orders"), 2);
        assert_eq!(h.notifier.shown(), 0);

        // The poller still compares against A1.
        ticks(1).await;
        assert_eq!(h.notifier.shown(), 1);
        assert_eq!(h.presenter.count("display-orders"), 3);
    }

    #[tokio::test]
    async fn refresh_orders_failure_reports_to_the_ui() {
        let h = harness(Some("key-1"), FakeGateway::default().with_orders(&[None]));

        assert!(h.controller.refresh_orders().await.is_err());
        assert_eq!(
            h.presenter.events.lock().unwrap().last(),
            Some(&UiEvent::GetOrdersError(ORDERS_FAILED.to_string()))
        );
    }

    #[tokio::test]
    async fn refresh_orders_error_keeps_the_cause() {
        let h = harness(Some("key-1"), FakeGateway::default().with_orders(&[None]));

        let err = h.controller.refresh_orders().await.unwrap_err();

        let rendered = format!("{err:#}");
        assert!(rendered.starts_with("failed to fetch orders: "), "{rendered}");
        assert!(rendered.contains("503"), "{rendered}");
    }

    #[tokio::test(start_paused = true)]
    async fn callers_wait_for_a_running_bootstrap() {
        let mut gateway = FakeGateway::default()
            .with_stats(&[Some(100)])
            .with_orders(&[Some("A1")]);
        gateway.stall_stats_call = Some(0);
        let h = harness(Some("key-1"), gateway);

        let controller = h.controller.clone();
        let running = tokio::spawn(async move { controller.bootstrap().await });
        time::sleep(Duration::from_millis(10)).await;

        let polling = time::timeout(Duration::from_secs(60), h.controller.is_polling()).await;
        assert!(polling.is_err(), "is_polling should wait on the seeding fetch");
        running.abort();
    }

    #[tokio::test]
    async fn refresh_orders_without_credential_fails_fast() {
        let h = harness(None, FakeGateway::default().with_orders(&[Some("A1")]));

        assert!(h.controller.refresh_orders().await.is_err());
        assert!(h.gateway.calls.lock().unwrap().is_empty());
        assert_eq!(h.presenter.count("get-orders-error"), 1);
    }
}
