//! Usage: Global tracing initialization (stdout plus a daily rolling file in the app log dir).

use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

const LOG_FILE_PREFIX: &str = "tiktok-live-hub.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub(crate) fn init() {
    match crate::infra::app_paths::log_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            // The guard must outlive the process or buffered lines are lost.
            let _ = FILE_GUARD.set(guard);

            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .try_init();
        }
        Err(err) => {
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer())
                .try_init();
            tracing::warn!("log dir unavailable, file logging disabled: {err}");
        }
    }

    let _ = tracing_log::LogTracer::init();
}
