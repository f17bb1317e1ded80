pub mod controller;
pub mod notify;
pub mod state;

pub use controller::{BootstrapOutcome, SyncController, API_KEY_SAVED, ORDERS_FAILED};
pub use notify::{
    ClickAction, LogNotifier, NotificationEmitter, Notifier, OrderAlert, WindowRequest,
    WindowRequests,
};
pub use state::{HeadOrderCell, OrdersChange, RevenueCell};
