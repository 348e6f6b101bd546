//! Usage: On-disk session cookie jar (whole-file JSON array, best-effort IO).
//!
//! A broken or missing jar is never fatal. The worst outcome is the user
//! logging in again by hand.

use crate::shared::error::AppResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
}

fn default_path() -> String {
    "/".to_string()
}

impl SessionCookie {
    /// Cookie domains often carry a leading dot; origins never do.
    pub fn normalized_domain(&self) -> &str {
        self.domain.strip_prefix('.').unwrap_or(&self.domain)
    }

    pub fn origin_url(&self) -> String {
        format!("https://{}{}", self.normalized_domain(), self.path)
    }
}

pub fn load(path: &Path) -> Vec<SessionCookie> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), "cookie jar unreadable, starting a fresh login: {err}");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(cookies) => cookies,
        Err(err) => {
            tracing::warn!(path = %path.display(), "cookie jar corrupt, starting a fresh login: {err}");
            Vec::new()
        }
    }
}

pub fn save(path: &Path, cookies: &[SessionCookie]) -> AppResult<()> {
    let content = serde_json::to_vec_pretty(cookies)
        .map_err(|e| format!("COOKIE_IO: cookie jar serialize failed: {e}"))?;
    std::fs::write(path, content).map_err(|e| format!("COOKIE_IO: cookie jar write failed: {e}"))?;
    Ok(())
}
