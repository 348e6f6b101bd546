//! Usage: Public test helpers for integration tests.

use std::path::PathBuf;

pub use crate::auth::cookie_store::{self, SessionCookie};
pub use crate::auth::ipc::{IpcMessage, IpcPayload, MessageKind, MessageRouter};
pub use crate::auth::login_flow::{
    AuthOutcome, BrowserSession, FlowEvent, LoginFlow, NavigationEvent,
};
pub use crate::auth::manager::AuthManager;
pub use crate::auth::pkce::{code_challenge_s256, generate_pkce_pair};
pub use crate::auth::token_cache;
pub use crate::auth::url_rules::{build_authorize_url, classify, UrlClass};
pub use crate::shared::error::{AppError, AppResult};

pub fn app_data_dir() -> AppResult<PathBuf> {
    crate::infra::app_paths::app_data_dir()
}

pub fn token_cache_path() -> AppResult<PathBuf> {
    crate::infra::app_paths::token_cache_path()
}

pub fn cookie_jar_path() -> AppResult<PathBuf> {
    crate::infra::app_paths::cookie_jar_path()
}
