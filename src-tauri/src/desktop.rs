//! Tauri shell: tray icon, main window, notifications and login item.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tauri::{
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    webview::PageLoadEvent,
    AppHandle, Emitter, Manager, WindowEvent,
};
use tauri_plugin_autostart::{MacosLauncher, ManagerExt as _};
use tauri_plugin_positioner::{Position, WindowExt};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    api::ShoprocketClient,
    commands,
    config::SyncConfig,
    events::{Presenter, UiEvent},
    launch::{self, LaunchAtLogin},
    settings::SettingsStore,
    sync::{
        ClickAction, NotificationEmitter, Notifier, OrderAlert, SyncController, WindowRequest,
        WindowRequests,
    },
    AppState, APP_VERSION,
};

const TRAY_ID: &str = "main";
const MAIN_WINDOW: &str = "main";

struct TauriPresenter {
    app: AppHandle,
}

impl Presenter for TauriPresenter {
    fn emit(&self, event: UiEvent) {
        if let UiEvent::TrayTitle(title) = &event {
            if let Some(tray) = self.app.tray_by_id(TRAY_ID) {
                if let Err(err) = tray.set_title(Some(format!("  {title}"))) {
                    log::warn!("Failed to set tray title: {err}");
                }
            }
            return;
        }

        if let Err(err) = self.app.emit(event.name(), event.payload()) {
            log::error!("Failed to emit {}: {err}", event.name());
        }
    }
}

/// Native alerts. Each one waits for its click on a blocking thread.
struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn show(&self, alert: &OrderAlert, on_click: ClickAction) -> Result<()> {
        let alert = alert.clone();
        tauri::async_runtime::spawn_blocking(move || {
            if let Err(err) = show_and_wait(&alert, &on_click) {
                log::error!("Failed to show new-order notification: {err:#}");
            }
        });
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn show_and_wait(alert: &OrderAlert, on_click: &ClickAction) -> Result<()> {
    use mac_notification_sys::{Notification, NotificationResponse};

    let response = Notification::new()
        .title(&alert.title)
        .message(&alert.body)
        .wait_for_click(true)
        .send()
        .map_err(|err| anyhow!("notification center: {err}"))?;
    if matches!(response, NotificationResponse::Click) {
        on_click.fire();
    }
    Ok(())
}

#[cfg(all(unix, not(target_os = "macos")))]
fn show_and_wait(alert: &OrderAlert, on_click: &ClickAction) -> Result<()> {
    notify_rust::Notification::new()
        .summary(&alert.title)
        .body(&alert.body)
        // "default" is the action servers invoke for a click on the body.
        .action("default", "View")
        .show()
        .map_err(|err| anyhow!("notification server: {err}"))?
        .wait_for_action(|action| {
            if action == "default" {
                on_click.fire();
            }
        });
    Ok(())
}

#[cfg(windows)]
fn show_and_wait(alert: &OrderAlert, _on_click: &ClickAction) -> Result<()> {
    // Toast activation is not reported back; the tray icon opens the window.
    notify_rust::Notification::new()
        .summary(&alert.title)
        .body(&alert.body)
        .show()
        .map_err(|err| anyhow!("toast: {err}"))?;
    Ok(())
}

struct TauriLauncher {
    app: AppHandle,
}

impl LaunchAtLogin for TauriLauncher {
    fn is_enabled(&self) -> Result<bool> {
        Ok(self.app.autolaunch().is_enabled()?)
    }

    fn enable(&self) -> Result<()> {
        Ok(self.app.autolaunch().enable()?)
    }

    fn disable(&self) -> Result<()> {
        Ok(self.app.autolaunch().disable()?)
    }
}

pub(crate) fn run() {
    let windows = WindowRequests::new();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_autostart::init(MacosLauncher::LaunchAgent, None))
        .plugin(tauri_plugin_positioner::init())
        .setup(move |app| {
            let result = (|| -> anyhow::Result<()> {
                // Menu-bar only on macOS, no dock icon.
                #[cfg(target_os = "macos")]
                app.set_activation_policy(tauri::ActivationPolicy::Accessory);

                #[cfg(target_os = "macos")]
                {
                    let identifier = &app.config().identifier;
                    if let Err(err) = mac_notification_sys::set_application(identifier) {
                        log::warn!("Could not register with the notification center: {err}");
                    }
                }

                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let settings_path = app_data_dir.join("settings.json");
                let settings = Arc::new(SettingsStore::new(settings_path)?);
                let handle = app.handle().clone();

                let launcher: Arc<dyn LaunchAtLogin> = Arc::new(TauriLauncher {
                    app: handle.clone(),
                });
                if let Err(err) = launch::reconcile(launcher.as_ref(), settings.auto_launch_enabled()) {
                    log::warn!("Could not apply launch-at-login preference: {err:#}");
                }

                let tray_requests = windows.clone();
                let mut builder = TrayIconBuilder::with_id(TRAY_ID);
                match app.default_window_icon() {
                    Some(icon) => builder = builder.icon(icon.clone()),
                    // The revenue title still shows in the menu bar.
                    None => log::warn!("No bundle icon configured; tray icon will be blank"),
                }
                builder
                    .on_tray_icon_event(move |tray, event| {
                        tauri_plugin_positioner::on_tray_event(tray.app_handle(), &event);
                        if let TrayIconEvent::Click {
                            button: MouseButton::Left,
                            button_state: MouseButtonState::Up,
                            ..
                        } = event
                        {
                            tray_requests.publish(WindowRequest::Toggle);
                        }
                    })
                    .build(app)?;
                spawn_window_listener(handle.clone(), windows.subscribe());

                let config = SyncConfig::from_env();
                let gateway = Arc::new(ShoprocketClient::new(&config)?);
                let notifications =
                    NotificationEmitter::new(Arc::new(DesktopNotifier), windows.clone());
                let sync = SyncController::new(
                    gateway,
                    Arc::new(TauriPresenter { app: handle }),
                    notifications,
                    settings,
                    config,
                );

                app.manage(AppState { sync, launcher });
                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .on_page_load(|webview, payload| {
            if !matches!(payload.event(), PageLoadEvent::Finished) {
                return;
            }
            let Some(state) = webview.try_state::<AppState>() else {
                return;
            };

            // Bootstrap once the page can receive events; a reload starts over.
            let sync = state.sync.clone();
            let presenter = TauriPresenter {
                app: webview.app_handle().clone(),
            };
            tauri::async_runtime::spawn(async move {
                sync.bootstrap().await;
            });
            presenter.emit(UiEvent::AppVersion(APP_VERSION.to_string()));
        })
        .on_window_event(|window, event| {
            if let WindowEvent::Focused(false) = event {
                if window.label() == MAIN_WINDOW {
                    if let Err(err) = window.hide() {
                        log::warn!("Failed to hide main window: {err}");
                    }
                }
            }
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_api_key,
            commands::set_api_key,
            commands::get_notifications_enabled,
            commands::set_notifications_enabled,
            commands::get_auto_launch_enabled,
            commands::set_auto_launch_enabled,
            commands::get_orders,
            commands::notification_clicked,
            commands::close_app,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

fn spawn_window_listener(app: AppHandle, mut requests: broadcast::Receiver<WindowRequest>) {
    tauri::async_runtime::spawn(async move {
        loop {
            match requests.recv().await {
                Ok(request) => apply_window_request(&app, request),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Skipped {skipped} window requests");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn apply_window_request(app: &AppHandle, request: WindowRequest) {
    let Some(window) = app.get_webview_window(MAIN_WINDOW) else {
        log::warn!("Main window is not available");
        return;
    };

    let result = (|| -> tauri::Result<()> {
        if request == WindowRequest::Toggle && window.is_visible()? {
            return window.hide();
        }

        // Tray position is only known after the first tray event.
        if let Err(err) = window.move_window(Position::TrayCenter) {
            log::debug!("Could not position window at tray: {err}");
        }
        if window.is_minimized()? {
            window.unminimize()?;
        }
        window.show()?;
        window.set_focus()
    })();

    if let Err(err) = result {
        log::error!("Failed to update main window: {err}");
    }
}
