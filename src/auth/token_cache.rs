//! Usage: Persisted auth result cache (tokens.json) with non-destructive merge on save.

use crate::shared::error::AppResult;
use serde_json::Value;
use std::path::Path;

pub fn load(path: &Path) -> Option<Value> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!(path = %path.display(), "token cache unreadable: {err}");
            return None;
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "token cache is not a JSON object, ignoring");
            None
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), "token cache corrupt, ignoring: {err}");
            None
        }
    }
}

pub fn cached_token(path: &Path) -> Option<String> {
    load(path)?
        .get("oauth_token")?
        .as_str()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Merges `record` keys into the existing cache object so unrelated keys
/// written by earlier runs survive a partial update.
pub fn save(path: &Path, record: &Value) -> AppResult<()> {
    let mut merged = load(path).unwrap_or_else(|| Value::Object(Default::default()));
    match (merged.as_object_mut(), record.as_object()) {
        (Some(base), Some(update)) => {
            for (key, value) in update {
                base.insert(key.clone(), value.clone());
            }
        }
        _ => merged = record.clone(),
    }

    let content = serde_json::to_string_pretty(&merged)
        .map_err(|e| format!("CACHE_IO: token cache serialize failed: {e}"))?;
    std::fs::write(path, content).map_err(|e| format!("CACHE_IO: token cache write failed: {e}"))?;
    Ok(())
}
