//! Usage: Persisted last-used stream settings (title/category/audience) with merge-on-save.

use crate::shared::error::AppResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct StreamSettings {
    pub(crate) title: Option<String>,
    pub(crate) game: Option<String>,
    pub(crate) audience_type: Option<String>,
}

impl StreamSettings {
    /// Merge: fields present in `update` win, absent fields keep the stored value.
    fn merged_with(mut self, update: StreamSettings) -> StreamSettings {
        if update.title.is_some() {
            self.title = update.title;
        }
        if update.game.is_some() {
            self.game = update.game;
        }
        if update.audience_type.is_some() {
            self.audience_type = update.audience_type;
        }
        self
    }
}

pub(crate) fn read(path: &Path) -> StreamSettings {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return StreamSettings::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), "stream settings unreadable, using defaults: {err}");
            return StreamSettings::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(path = %path.display(), "stream settings corrupt, using defaults: {err}");
            StreamSettings::default()
        }
    }
}

pub(crate) fn write(path: &Path, update: StreamSettings) -> AppResult<StreamSettings> {
    let next = read(path).merged_with(update);
    let content = serde_json::to_string_pretty(&next)
        .map_err(|e| format!("SYSTEM_ERROR: stream settings serialize failed: {e}"))?;
    std::fs::write(path, content)
        .map_err(|e| format!("SYSTEM_ERROR: stream settings write failed: {e}"))?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = read(&dir.path().join("stream_settings.json"));
        assert_eq!(settings, StreamSettings::default());
    }

    #[test]
    fn write_merges_without_clearing_absent_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stream_settings.json");

        write(
            &path,
            StreamSettings {
                title: Some("morning run".into()),
                game: Some("Just Chatting".into()),
                audience_type: None,
            },
        )
        .expect("first write");

        let next = write(
            &path,
            StreamSettings {
                title: Some("evening run".into()),
                game: None,
                audience_type: None,
            },
        )
        .expect("second write");

        assert_eq!(next.title.as_deref(), Some("evening run"));
        assert_eq!(next.game.as_deref(), Some("Just Chatting"));
    }

    #[test]
    fn corrupt_file_reads_as_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stream_settings.json");
        std::fs::write(&path, "{ not json").expect("write corrupt");
        assert_eq!(read(&path), StreamSettings::default());
    }
}
