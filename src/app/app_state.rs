//! Usage: Shared Tauri state types used by `commands/*`.

use crate::shared::error::AppResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Guards against concurrent login attempts. One webview-driven flow at a time;
/// a second `auth_login` while one is running is a caller bug, not a queue.
#[derive(Default)]
pub(crate) struct AuthAttemptState {
    in_flight: Arc<AtomicBool>,
}

impl AuthAttemptState {
    pub(crate) fn begin(&self) -> AppResult<AttemptGuard> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err("SYSTEM_ERROR: a login attempt is already in progress".into());
        }
        Ok(AttemptGuard {
            flag: Arc::clone(&self.in_flight),
        })
    }
}

pub(crate) struct AttemptGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Identifier of the live stream started in this session, if any.
#[derive(Default)]
pub(crate) struct StreamState(pub(crate) Mutex<Option<String>>);
