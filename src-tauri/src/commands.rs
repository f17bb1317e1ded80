use tauri::{AppHandle, State};

use crate::{api::OrderRecord, launch, AppState};

#[tauri::command]
pub fn get_api_key(state: State<'_, AppState>) -> Option<String> {
    state.sync.settings().api_key()
}

#[tauri::command]
pub async fn set_api_key(state: State<'_, AppState>, api_key: String) -> Result<String, String> {
    let controller = state.sync.clone();
    controller
        .set_api_key(api_key)
        .await
        .map(str::to_string)
        .map_err(|e| format!("{e:#}"))
}

#[tauri::command]
pub fn get_notifications_enabled(state: State<'_, AppState>) -> bool {
    state.sync.settings().notifications_enabled()
}

#[tauri::command]
pub fn set_notifications_enabled(state: State<'_, AppState>, enabled: bool) -> Result<(), String> {
    state
        .sync
        .settings()
        .set_notifications_enabled(enabled)
        .map_err(|e| format!("{e:#}"))
}

#[tauri::command]
pub fn get_auto_launch_enabled(state: State<'_, AppState>) -> bool {
    state.sync.settings().auto_launch_enabled()
}

#[tauri::command]
pub fn set_auto_launch_enabled(state: State<'_, AppState>, enabled: bool) -> Result<(), String> {
    launch::set_preference(state.sync.settings(), state.launcher.as_ref(), enabled)
        .map_err(|e| format!("{e:#}"))
}

#[tauri::command]
pub async fn get_orders(state: State<'_, AppState>) -> Result<Vec<OrderRecord>, String> {
    let controller = state.sync.clone();
    controller
        .refresh_orders()
        .await
        .map_err(|e| format!("{e:#}"))
}

#[tauri::command]
pub fn notification_clicked(state: State<'_, AppState>) {
    state.sync.notifications().clicked();
}

#[tauri::command]
pub fn close_app(app: AppHandle) {
    app.exit(0);
}
