mod api;
mod app;
mod auth;
mod commands;
mod infra;
mod shared;
pub mod test_support;

use app::app_state::{AuthAttemptState, StreamState};
use commands::*;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let app = tauri::Builder::default()
        .manage(AuthAttemptState::default())
        .manage(StreamState::default())
        .setup(|_app| {
            crate::app::logging::init();

            // Global panic hook: any panic lands in the disk logs for post-mortem
            // diagnosis. The payload is intentionally NOT logged, it can carry
            // user data.
            std::panic::set_hook(Box::new(|panic_info| {
                let location = panic_info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::error!(
                    location = %location,
                    "PANIC: application panicked at {location}. Check the log file for context leading up to this panic."
                );
            }));

            tracing::info!("tiktok live hub started");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            auth_login,
            auth_token_get,
            auth_cache_clear,
            login_window_close,
            stream_search,
            stream_start,
            stream_end,
            stream_settings_get
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|_app_handle, _event| {});
}
