//! Usage: Authentication-related Tauri commands.

use crate::app::app_state::AuthAttemptState;
use crate::auth::{manager::AuthManager, webview};
use crate::shared::blocking;
use crate::shared::error::AppResult;
use tauri::Manager;

/// Opens the login webview (unless a cached token short-circuits) and returns
/// the full auth record. Only one attempt may run at a time.
#[tauri::command]
pub(crate) async fn auth_login(
    app: tauri::AppHandle,
    state: tauri::State<'_, AuthAttemptState>,
) -> Result<serde_json::Value, String> {
    let _guard = state.begin().map_err(String::from)?;

    let manager = AuthManager::from_app_dirs().map_err(String::from)?;
    manager
        .retrieve_auth_data(move |events| webview::open_login_session(&app, events))
        .await
        .map_err(String::from)
}

#[tauri::command]
pub(crate) async fn auth_token_get() -> Result<Option<String>, String> {
    blocking::run("auth_token_get", move || -> AppResult<Option<String>> {
        Ok(AuthManager::from_app_dirs()?.cached_token())
    })
    .await
    .map_err(Into::into)
}

#[tauri::command]
pub(crate) async fn auth_cache_clear() -> Result<(), String> {
    blocking::run("auth_cache_clear", move || -> AppResult<()> {
        AuthManager::from_app_dirs()?.clear_cache()
    })
    .await
    .map_err(Into::into)
}

/// Abort gesture for the UI; the flow itself observes the closure and fails
/// with WINDOW_CLOSED.
#[tauri::command]
pub(crate) async fn login_window_close(app: tauri::AppHandle) -> Result<bool, String> {
    match app.get_webview_window(webview::LOGIN_WINDOW_LABEL) {
        Some(window) => {
            window.close().map_err(|e| e.to_string())?;
            Ok(true)
        }
        None => Ok(false),
    }
}
