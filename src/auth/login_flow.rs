//! Usage: Navigation-driven acquisition state machine for one Streamlabs token attempt.
//!
//! One flow owns one browser session and resolves exactly once. Navigation
//! callbacks arrive from both the full-load hook and the in-page history hook,
//! so the same logical URL is routinely reported twice; correctness rests on a
//! single-fire guard around code capture, not on mutual exclusion.

use crate::auth::cookie_store::{self, SessionCookie};
use crate::auth::ipc::{IpcMessage, IpcPayload};
use crate::auth::url_rules::{self, UrlClass};
use crate::shared::error::AppResult;
use crate::shared::security::mask_token;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Humans type passwords and solve CAPTCHAs; five minutes covers that.
pub const OVERALL_DEADLINE: Duration = Duration::from_secs(300);

/// Login success triggers a burst of redirects. Wait for them to settle before
/// trusting the URL enough to force the consent hop.
const LOGIN_SETTLE_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AcquisitionPhase {
    Idle,
    SessionLoaded,
    LoginPageLoaded,
    LoginDetected,
    AuthRedirectPending,
    CodeCaptured,
    TokenExchangeInFlight,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct NavigationEvent {
    pub url: String,
    pub during_page_load: bool,
}

#[derive(Debug)]
pub enum FlowEvent {
    Navigated(NavigationEvent),
    Inbound(IpcMessage),
    WindowClosed,
}

/// Seam between the flow and whatever renders pages. Production wires a Tauri
/// webview; tests drive a scripted fake.
pub trait BrowserSession: Send {
    fn navigate(&self, url: &str) -> AppResult<()>;
    fn current_url(&self) -> AppResult<String>;
    fn preload_cookies(&self, cookies: &[SessionCookie]) -> AppResult<()>;
    fn run_script(&self, script: &str) -> AppResult<()>;
    fn close(&self);
}

#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub oauth_token: String,
    /// Full `data` object from the exchange response, token included.
    pub record: Value,
}

pub struct LoginFlow<S: BrowserSession> {
    session: S,
    events: mpsc::UnboundedReceiver<FlowEvent>,
    authorize_url: String,
    code_verifier: Option<String>,
    cookie_jar: PathBuf,
    phase: AcquisitionPhase,
    exchange_fired: bool,
    latest_cookies: Vec<SessionCookie>,
}

impl<S: BrowserSession> LoginFlow<S> {
    pub fn new(
        session: S,
        events: mpsc::UnboundedReceiver<FlowEvent>,
        authorize_url: String,
        code_verifier: String,
        cookie_jar: PathBuf,
    ) -> Self {
        Self {
            session,
            events,
            authorize_url,
            code_verifier: Some(code_verifier),
            cookie_jar,
            phase: AcquisitionPhase::Idle,
            exchange_fired: false,
            latest_cookies: Vec::new(),
        }
    }

    /// Runs the attempt to its single terminal outcome. The session is closed
    /// on every exit path and never reused.
    pub async fn find_token(mut self) -> AppResult<AuthOutcome> {
        let result = match self.start() {
            Ok(()) => match tokio::time::timeout(OVERALL_DEADLINE, self.run()).await {
                Ok(result) => result,
                Err(_) => Err("FLOW_TIMEOUT: login flow exceeded the overall deadline".into()),
            },
            Err(err) => Err(err),
        };

        self.phase = match &result {
            Ok(_) => AcquisitionPhase::Completed,
            Err(_) => AcquisitionPhase::Failed,
        };
        self.session.close();

        if let Err(err) = &result {
            tracing::warn!(code = err.code(), "login flow failed: {err}");
        }
        result
    }

    fn start(&mut self) -> AppResult<()> {
        let cookies = cookie_store::load(&self.cookie_jar);
        if !cookies.is_empty() {
            tracing::info!(count = cookies.len(), "preloading saved session cookies");
            if let Err(err) = self.session.preload_cookies(&cookies) {
                tracing::warn!("cookie preload failed, continuing with a fresh login: {err}");
            }
        }
        self.phase = AcquisitionPhase::SessionLoaded;

        self.session.navigate(url_rules::TIKTOK_LOGIN_URL)?;
        self.phase = AcquisitionPhase::LoginPageLoaded;
        Ok(())
    }

    async fn run(&mut self) -> AppResult<AuthOutcome> {
        loop {
            let event = self.events.recv().await.ok_or_else(|| {
                String::from("SYSTEM_ERROR: session event channel closed mid-flow")
            })?;

            match event {
                FlowEvent::WindowClosed => {
                    return Err(format!(
                        "WINDOW_CLOSED: login window closed before the token was obtained (phase {:?})",
                        self.phase
                    )
                    .into());
                }
                FlowEvent::Navigated(nav) => self.on_navigation(nav).await?,
                FlowEvent::Inbound(message) => {
                    if let Some(outcome) = self.on_message(message)? {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    async fn on_navigation(&mut self, nav: NavigationEvent) -> AppResult<()> {
        tracing::debug!(
            url = %nav.url,
            during_page_load = nav.during_page_load,
            phase = ?self.phase,
            "navigation observed"
        );

        match url_rules::classify(&nav.url) {
            UrlClass::ProviderLoggedIn
                if matches!(
                    self.phase,
                    AcquisitionPhase::SessionLoaded | AcquisitionPhase::LoginPageLoaded
                ) =>
            {
                tokio::time::sleep(LOGIN_SETTLE_DELAY).await;
                // The event URL is stale by now; trust only a fresh read.
                let current = self
                    .session
                    .current_url()
                    .unwrap_or_else(|_| nav.url.clone());
                if matches!(url_rules::classify(&current), UrlClass::ProviderLoggedIn) {
                    self.force_authorize()?;
                }
            }
            UrlClass::ConsentGranted { code } => self.capture_code(code)?,
            UrlClass::ProviderLogin
            | UrlClass::ProviderLoggedIn
            | UrlClass::ConsentPending
            | UrlClass::Other => {}
        }
        Ok(())
    }

    fn force_authorize(&mut self) -> AppResult<()> {
        if self.phase >= AcquisitionPhase::AuthRedirectPending {
            return Ok(());
        }
        self.phase = AcquisitionPhase::LoginDetected;
        tracing::info!("provider login detected, navigating to the consent page");
        self.session.navigate(&self.authorize_url)?;
        self.phase = AcquisitionPhase::AuthRedirectPending;
        Ok(())
    }

    fn capture_code(&mut self, code: String) -> AppResult<()> {
        if self.exchange_fired {
            tracing::debug!("duplicate code capture ignored");
            return Ok(());
        }
        self.exchange_fired = true;
        self.phase = AcquisitionPhase::CodeCaptured;

        let verifier = self.code_verifier.take().ok_or_else(|| {
            String::from("MISSING_VERIFIER: authorization code captured without a held verifier")
        })?;

        // Persist the freshest session snapshot first; it is what lets the
        // next run skip the login page entirely.
        if !self.latest_cookies.is_empty() {
            if let Err(err) = cookie_store::save(&self.cookie_jar, &self.latest_cookies) {
                tracing::warn!("cookie jar save failed, session will not persist: {err}");
            }
        }

        tracing::info!(code = %mask_token(&code), "authorization code captured, starting exchange");
        let script = build_exchange_script(&code, &verifier);
        self.phase = AcquisitionPhase::TokenExchangeInFlight;
        self.session.run_script(&script)?;
        Ok(())
    }

    fn on_message(&mut self, message: IpcMessage) -> AppResult<Option<AuthOutcome>> {
        match &message.body {
            IpcPayload::WindowContext(payload) => {
                self.absorb_context(payload);
                if self.phase == AcquisitionPhase::TokenExchangeInFlight {
                    if let Some(report) = payload.get("exchange") {
                        return self.interpret_exchange(report).map(Some);
                    }
                }
                Ok(None)
            }
            IpcPayload::UserAction(payload) => {
                let action = payload.get("action").and_then(Value::as_str);
                if action == Some("force-authorize")
                    && self.phase < AcquisitionPhase::AuthRedirectPending
                {
                    tracing::info!("manual authorize control activated");
                    self.force_authorize()?;
                }
                Ok(None)
            }
            IpcPayload::LogEvent(payload) => {
                tracing::debug!(payload = %payload, "page log event");
                Ok(None)
            }
            IpcPayload::RawString(payload) => {
                tracing::trace!(payload = %payload, "raw page message");
                Ok(None)
            }
        }
    }

    /// Context snapshots are the only cookie source; the webview API never
    /// exposes the jar directly.
    fn absorb_context(&mut self, payload: &Value) {
        let Some(raw) = payload.get("cookies") else {
            return;
        };
        match serde_json::from_value::<Vec<SessionCookie>>(raw.clone()) {
            Ok(cookies) if !cookies.is_empty() => self.latest_cookies = cookies,
            Ok(_) => {}
            Err(err) => tracing::debug!("unusable cookie snapshot: {err}"),
        }
    }

    fn interpret_exchange(&mut self, report: &Value) -> AppResult<AuthOutcome> {
        let fetched = report
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !fetched {
            let detail = report
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("fetch failed");
            return Err(format!("EXCHANGE_FAILED: token exchange request failed: {detail}").into());
        }

        let Some(body) = report.get("data") else {
            let raw = report.get("body").and_then(Value::as_str).unwrap_or("");
            return Err(
                format!("EXCHANGE_PARSE: token exchange returned a non-JSON body: {raw}").into(),
            );
        };

        let granted = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        let token = body
            .get("data")
            .and_then(|data| data.get("oauth_token"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|token| !token.is_empty());

        match (granted, token) {
            (true, Some(token)) => {
                tracing::info!(token = %mask_token(token), "token exchange completed");
                Ok(AuthOutcome {
                    oauth_token: token.to_string(),
                    record: body.get("data").cloned().unwrap_or_else(|| json!({})),
                })
            }
            _ => Err(format!("EXCHANGE_FAILED: token exchange reported failure: {body}").into()),
        }
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// The exchange must run inside the page so the request rides on the webview's
/// own Streamlabs cookies; `fetch` from Rust would not carry them.
fn build_exchange_script(code: &str, code_verifier: &str) -> String {
    let endpoint = url_rules::TOKEN_EXCHANGE_URL;
    let code_js = js_string(code);
    let verifier_js = js_string(code_verifier);
    format!(
        r#"(function () {{
  if (!window.__TAURI__ || !window.__TAURI__.event) {{ return; }}
  var emit = function (report) {{
    window.__TAURI__.event.emit("ipc-message", JSON.stringify({{
      type: "WINDOW_CONTEXT",
      payload: {{ exchange: report }}
    }}));
  }};
  var url = "{endpoint}?code=" + encodeURIComponent({code_js}) +
    "&code_verifier=" + encodeURIComponent({verifier_js});
  fetch(url, {{
    credentials: "include",
    headers: {{ "Accept": "application/json", "X-Requested-With": "XMLHttpRequest" }}
  }}).then(function (resp) {{
    return resp.text().then(function (text) {{
      var report = {{ success: true, status: resp.status }};
      try {{ report.data = JSON.parse(text); }} catch (e) {{ report.body = text; }}
      emit(report);
    }});
  }}).catch(function (err) {{
    emit({{ success: false, error: String(err) }});
  }});
}})();"#
    )
}
