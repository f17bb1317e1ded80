use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;

pub const NEW_ORDER_TITLE: &str = "New Order Received!";
pub const NEW_ORDER_BODY: &str = "Click here to view details.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAlert {
    pub title: String,
    pub body: String,
}

impl OrderAlert {
    pub fn new_order() -> Self {
        Self {
            title: NEW_ORDER_TITLE.to_string(),
            body: NEW_ORDER_BODY.to_string(),
        }
    }
}

/// Requests for the shell to move the main window. Published by the tray icon
/// and by notification clicks; the shell owns window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRequest {
    /// Show next to the tray if hidden, hide if visible.
    Toggle,
    /// Bring to the foreground next to the tray, restoring if minimized.
    Focus,
}

#[derive(Clone)]
pub struct WindowRequests {
    tx: broadcast::Sender<WindowRequest>,
}

impl WindowRequests {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn publish(&self, request: WindowRequest) {
        // No subscriber just means there is no window yet.
        if self.tx.send(request).is_err() {
            log::debug!("Dropped {request:?}: no window listener");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WindowRequest> {
        self.tx.subscribe()
    }
}

impl Default for WindowRequests {
    fn default() -> Self {
        Self::new()
    }
}

/// Click-through for one alert. Firing it brings the main window forward.
#[derive(Clone)]
pub struct ClickAction {
    windows: WindowRequests,
}

impl ClickAction {
    pub fn fire(&self) {
        log::info!("New-order notification clicked");
        self.windows.publish(WindowRequest::Focus);
    }
}

/// Platform alert sink. Implementations that can observe a click on the
/// alert call `on_click.fire()` when it happens.
pub trait Notifier: Send + Sync {
    fn show(&self, alert: &OrderAlert, on_click: ClickAction) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, alert: &OrderAlert, _on_click: ClickAction) -> Result<()> {
        log::info!("{} {}", alert.title, alert.body);
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationEmitter {
    notifier: Arc<dyn Notifier>,
    windows: WindowRequests,
}

impl NotificationEmitter {
    pub fn new(notifier: Arc<dyn Notifier>, windows: WindowRequests) -> Self {
        Self { notifier, windows }
    }

    pub fn notify_new_order(&self) {
        if let Err(err) = self.notifier.show(&OrderAlert::new_order(), self.click_action()) {
            log::error!("Failed to show new-order notification: {err:#}");
        }
    }

    /// Click-through reported by the webview rather than the notifier.
    pub fn clicked(&self) {
        self.click_action().fire();
    }

    fn click_action(&self) -> ClickAction {
        ClickAction {
            windows: self.windows.clone(),
        }
    }
}
