//! Runs the sync loop without a window: pushes become log lines and
//! new-order alerts go to the log as well.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};

use crate::{
    api::ShoprocketClient,
    config::SyncConfig,
    events::{LogPresenter, Presenter, UiEvent},
    settings::{ApiKey, SettingsStore},
    sync::{BootstrapOutcome, LogNotifier, NotificationEmitter, SyncController, WindowRequests},
    APP_VERSION,
};

pub(crate) fn run() -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(serve())
}

async fn serve() -> Result<()> {
    let settings = Arc::new(SettingsStore::new(settings_path()?)?);

    // Treated like a key submitted from the settings screen.
    if let Ok(raw) = std::env::var("SHOPROCKET_API_KEY") {
        if ApiKey::new(&raw).is_some() {
            settings.update_api_key(raw)?;
        }
    }

    let config = SyncConfig::from_env();
    let gateway = Arc::new(ShoprocketClient::new(&config)?);
    let presenter = Arc::new(LogPresenter);
    let notifications = NotificationEmitter::new(Arc::new(LogNotifier), WindowRequests::new());
    let controller =
        SyncController::new(gateway, presenter.clone(), notifications, settings, config);

    presenter.emit(UiEvent::AppVersion(APP_VERSION.to_string()));

    if controller.bootstrap().await == BootstrapOutcome::NeedsCredential {
        return Ok(());
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    log::info!("Shutting down");
    Ok(())
}

fn settings_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SHOPROCKET_SETTINGS_PATH") {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir().context("no per-user config directory on this platform")?;
    Ok(config_dir.join("shoprocket-tray").join("settings.json"))
}
