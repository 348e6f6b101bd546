pub mod cookie_store;
pub mod ipc;
pub mod login_flow;
pub mod manager;
pub mod pkce;
pub mod token_cache;
pub mod url_rules;
pub(crate) mod webview;
