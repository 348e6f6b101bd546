//! Usage: Stream control Tauri commands, thin wrappers over the Streamlabs REST client.

use crate::api::stream::{StreamApi, StreamCategory, StreamInfo};
use crate::app::app_state::StreamState;
use crate::auth::manager::AuthManager;
use crate::infra::{app_paths, stream_settings};
use crate::shared::blocking;
use crate::shared::error::AppResult;
use crate::shared::mutex_ext::MutexExt;

const DEFAULT_AUDIENCE_TYPE: &str = "0";

fn api_from_cache() -> AppResult<StreamApi> {
    let token = AuthManager::from_app_dirs()?
        .cached_token()
        .ok_or_else(|| String::from("AUTH_REQUIRED: no cached oauth token, log in first"))?;
    StreamApi::new(&token)
}

#[tauri::command]
pub(crate) async fn stream_search(query: String) -> Result<Vec<StreamCategory>, String> {
    let api = blocking::run("stream_search_token", api_from_cache)
        .await
        .map_err(String::from)?;
    api.search_categories(&query).await.map_err(String::from)
}

#[tauri::command]
pub(crate) async fn stream_start(
    title: String,
    category: String,
    state: tauri::State<'_, StreamState>,
) -> Result<StreamInfo, String> {
    let api = blocking::run("stream_start_token", api_from_cache)
        .await
        .map_err(String::from)?;

    let info = api
        .start_stream(&title, &category, DEFAULT_AUDIENCE_TYPE)
        .await
        .map_err(String::from)?;

    *state.0.lock_or_recover() = Some(info.id.clone());
    tracing::info!(stream_id = %info.id, "stream started");

    // Remember the last-used settings for the next session, best effort.
    let settings_update = stream_settings::StreamSettings {
        title: Some(title),
        game: Some(category),
        audience_type: Some(DEFAULT_AUDIENCE_TYPE.to_string()),
    };
    let _ = blocking::run(
        "stream_settings_save",
        move || -> AppResult<stream_settings::StreamSettings> {
            stream_settings::write(&app_paths::stream_settings_path()?, settings_update)
        },
    )
    .await;

    Ok(info)
}

#[tauri::command]
pub(crate) async fn stream_end(state: tauri::State<'_, StreamState>) -> Result<bool, String> {
    let Some(stream_id) = state.0.lock_or_recover().clone() else {
        return Err("STREAM_STATE: no stream was started in this session".to_string());
    };

    let api = blocking::run("stream_end_token", api_from_cache)
        .await
        .map_err(String::from)?;
    let ended = api.end_stream(&stream_id).await.map_err(String::from)?;

    if ended {
        *state.0.lock_or_recover() = None;
        tracing::info!(stream_id = %stream_id, "stream ended");
    }
    Ok(ended)
}

#[tauri::command]
pub(crate) async fn stream_settings_get() -> Result<stream_settings::StreamSettings, String> {
    blocking::run(
        "stream_settings_get",
        move || -> AppResult<stream_settings::StreamSettings> {
            Ok(stream_settings::read(&app_paths::stream_settings_path()?))
        },
    )
    .await
    .map_err(Into::into)
}
