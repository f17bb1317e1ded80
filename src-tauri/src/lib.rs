pub mod api;
pub mod config;
pub mod events;
pub mod launch;
pub mod settings;
pub mod sync;
mod utils;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod desktop;
#[cfg(not(feature = "desktop"))]
mod headless;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(feature = "desktop")]
pub(crate) struct AppState {
    pub(crate) sync: sync::SyncController,
    pub(crate) launcher: std::sync::Arc<dyn launch::LaunchAtLogin>,
}

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Shoprocket tray {APP_VERSION} starting up...");

    #[cfg(feature = "desktop")]
    desktop::run();

    #[cfg(not(feature = "desktop"))]
    {
        if let Err(err) = headless::run() {
            log::error!("{err:#}");
            std::process::exit(1);
        }
    }
}
