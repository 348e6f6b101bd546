//! Usage: Unix time helpers shared by the message envelope and persistence layers.

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn now_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
