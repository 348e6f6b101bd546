//! Usage: Token acquisition facade. Cache fast path, otherwise one login flow attempt.

use crate::auth::login_flow::{BrowserSession, FlowEvent, LoginFlow};
use crate::auth::{pkce, token_cache, url_rules};
use crate::infra::app_paths;
use crate::shared::error::AppResult;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

pub struct AuthManager {
    cookie_jar: PathBuf,
    token_cache: PathBuf,
}

impl AuthManager {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            cookie_jar: data_dir.join(app_paths::COOKIE_JAR_FILE),
            token_cache: data_dir.join(app_paths::TOKEN_CACHE_FILE),
        }
    }

    pub fn from_app_dirs() -> AppResult<Self> {
        Ok(Self::new(&app_paths::app_data_dir()?))
    }

    pub fn cached_token(&self) -> Option<String> {
        token_cache::cached_token(&self.token_cache)
    }

    pub fn clear_cache(&self) -> AppResult<()> {
        for path in [&self.token_cache, &self.cookie_jar] {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(
                        format!("CACHE_IO: removing {} failed: {err}", path.display()).into(),
                    )
                }
            }
        }
        Ok(())
    }

    /// Returns the full cached or freshly acquired auth record. `open_session`
    /// is only invoked on a cache miss; exactly one flow runs per call, with
    /// no internal retry.
    pub async fn retrieve_auth_data<S, F>(&self, open_session: F) -> AppResult<Value>
    where
        S: BrowserSession,
        F: FnOnce(mpsc::UnboundedSender<FlowEvent>) -> AppResult<S>,
    {
        if let Some(cached) = token_cache::load(&self.token_cache) {
            if cached
                .get("oauth_token")
                .and_then(Value::as_str)
                .map(str::trim)
                .is_some_and(|token| !token.is_empty())
            {
                tracing::info!("using cached oauth token");
                return Ok(cached);
            }
        }

        let pair = pkce::generate_pkce_pair();
        let authorize_url = url_rules::build_authorize_url(&pair.code_challenge);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = open_session(events_tx)?;
        let flow = LoginFlow::new(
            session,
            events_rx,
            authorize_url,
            pair.code_verifier,
            self.cookie_jar.clone(),
        );
        let outcome = flow.find_token().await?;

        let mut record = if outcome.record.is_object() {
            outcome.record
        } else {
            json!({})
        };
        if let Some(fields) = record.as_object_mut() {
            fields.insert("oauth_token".to_string(), json!(outcome.oauth_token));
        }

        if let Err(err) = token_cache::save(&self.token_cache, &record) {
            tracing::warn!("token cache save failed, token will not persist: {err}");
        }
        Ok(record)
    }

    /// Convenience wrapper for callers that only need the bearer token.
    pub async fn retrieve_token<S, F>(&self, open_session: F) -> AppResult<String>
    where
        S: BrowserSession,
        F: FnOnce(mpsc::UnboundedSender<FlowEvent>) -> AppResult<S>,
    {
        let record = self.retrieve_auth_data(open_session).await?;
        record
            .get("oauth_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "EXCHANGE_FAILED: auth record is missing oauth_token".into())
    }
}
