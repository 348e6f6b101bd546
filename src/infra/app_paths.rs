//! Usage: Application data/log directory resolution with a dotdir override for tests.

use crate::shared::error::AppResult;
use std::path::PathBuf;

const DEFAULT_DOTDIR_NAME: &str = ".tiktok-live-hub";
const DOTDIR_ENV: &str = "TIKTOK_LIVE_HUB_DOTDIR_NAME";

pub(crate) const COOKIE_JAR_FILE: &str = "cookies.json";
pub(crate) const TOKEN_CACHE_FILE: &str = "tokens.json";
pub(crate) const STREAM_SETTINGS_FILE: &str = "stream_settings.json";

fn dotdir_name() -> String {
    match std::env::var(DOTDIR_ENV) {
        Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => DEFAULT_DOTDIR_NAME.to_string(),
    }
}

fn home_dir() -> AppResult<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or_else(|| "SYSTEM_ERROR: neither HOME nor USERPROFILE is set".into())
}

pub(crate) fn app_data_dir() -> AppResult<PathBuf> {
    let dir = home_dir()?.join(dotdir_name());
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("SYSTEM_ERROR: app data dir creation failed: {e}"))?;
    Ok(dir)
}

pub(crate) fn log_dir() -> AppResult<PathBuf> {
    let dir = app_data_dir()?.join("logs");
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("SYSTEM_ERROR: log dir creation failed: {e}"))?;
    Ok(dir)
}

pub(crate) fn cookie_jar_path() -> AppResult<PathBuf> {
    Ok(app_data_dir()?.join(COOKIE_JAR_FILE))
}

pub(crate) fn token_cache_path() -> AppResult<PathBuf> {
    Ok(app_data_dir()?.join(TOKEN_CACHE_FILE))
}

pub(crate) fn stream_settings_path() -> AppResult<PathBuf> {
    Ok(app_data_dir()?.join(STREAM_SETTINGS_FILE))
}
