use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tiktok_live_hub_lib::test_support::{
    token_cache, AppResult, AuthManager, BrowserSession, FlowEvent, IpcMessage, IpcPayload,
    LoginFlow, NavigationEvent, SessionCookie,
};
use tokio::sync::mpsc;

const FEED_URL: &str = "https://www.tiktok.com/foryou";
const CONSENT_URL: &str = "https://streamlabs.com/tiktok/auth?success=true&code=abc123";

fn granted_exchange(token: &str) -> Value {
    json!({
        "success": true,
        "status": 200,
        "data": {
            "success": true,
            "data": { "oauth_token": token, "open_id": "user-1" }
        }
    })
}

/// Plays back a canned login from the far side of the session seam: navigating
/// to the login page "logs in" and lands on the feed, navigating to the
/// consent URL grants the code, and the injected exchange script reports
/// whatever `exchange_report` says.
struct ScriptedSession {
    events: mpsc::UnboundedSender<FlowEvent>,
    current: Arc<Mutex<String>>,
    navigations: Arc<Mutex<Vec<String>>>,
    script_runs: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    exchange_report: Value,
    duplicate_consent: bool,
    close_on_login: bool,
    /// Login page that never logs in: no navigation or context events fire.
    silent_login: bool,
    cookie_snapshot: Option<Vec<SessionCookie>>,
}

struct SessionProbes {
    navigations: Arc<Mutex<Vec<String>>>,
    script_runs: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl ScriptedSession {
    fn new(events: mpsc::UnboundedSender<FlowEvent>, exchange_report: Value) -> (Self, SessionProbes) {
        let session = Self {
            events,
            current: Arc::new(Mutex::new("about:blank".to_string())),
            navigations: Arc::new(Mutex::new(Vec::new())),
            script_runs: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
            exchange_report,
            duplicate_consent: false,
            close_on_login: false,
            silent_login: false,
            cookie_snapshot: None,
        };
        let probes = SessionProbes {
            navigations: Arc::clone(&session.navigations),
            script_runs: Arc::clone(&session.script_runs),
            closed: Arc::clone(&session.closed),
        };
        (session, probes)
    }

    fn send_nav(&self, url: &str, during_page_load: bool) {
        let _ = self.events.send(FlowEvent::Navigated(NavigationEvent {
            url: url.to_string(),
            during_page_load,
        }));
    }

    fn send_context(&self, payload: Value) {
        let _ = self.events.send(FlowEvent::Inbound(IpcMessage {
            body: IpcPayload::WindowContext(payload),
            id: None,
            timestamp: None,
        }));
    }
}

impl BrowserSession for ScriptedSession {
    fn navigate(&self, url: &str) -> AppResult<()> {
        self.navigations.lock().unwrap().push(url.to_string());

        if url.contains("tiktok.com/login") {
            if self.close_on_login {
                let _ = self.events.send(FlowEvent::WindowClosed);
                return Ok(());
            }
            if self.silent_login {
                return Ok(());
            }
            self.send_nav(url, true);
            if let Some(cookies) = &self.cookie_snapshot {
                self.send_context(json!({
                    "url": FEED_URL,
                    "cookies": serde_json::to_value(cookies).unwrap(),
                }));
            }
            *self.current.lock().unwrap() = FEED_URL.to_string();
            self.send_nav(FEED_URL, false);
            return Ok(());
        }

        if url.contains("code_challenge") {
            *self.current.lock().unwrap() = CONSENT_URL.to_string();
            self.send_nav(CONSENT_URL, true);
            if self.duplicate_consent {
                // The in-page history hook reports the same URL again.
                self.send_nav(CONSENT_URL, false);
            }
            return Ok(());
        }

        Ok(())
    }

    fn current_url(&self) -> AppResult<String> {
        Ok(self.current.lock().unwrap().clone())
    }

    fn preload_cookies(&self, _cookies: &[SessionCookie]) -> AppResult<()> {
        Ok(())
    }

    fn run_script(&self, script: &str) -> AppResult<()> {
        assert!(script.contains("code_verifier"));
        self.script_runs.fetch_add(1, Ordering::SeqCst);
        self.send_context(json!({ "exchange": self.exchange_report.clone() }));
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn run_flow(
    session: ScriptedSession,
    events_rx: mpsc::UnboundedReceiver<FlowEvent>,
    cookie_jar: std::path::PathBuf,
) -> impl std::future::Future<Output = AppResult<tiktok_live_hub_lib::test_support::AuthOutcome>> {
    let pair = tiktok_live_hub_lib::test_support::generate_pkce_pair();
    let authorize_url =
        tiktok_live_hub_lib::test_support::build_authorize_url(&pair.code_challenge);
    LoginFlow::new(session, events_rx, authorize_url, pair.code_verifier, cookie_jar).find_token()
}

#[tokio::test(start_paused = true)]
async fn scripted_login_resolves_the_token_and_fires_the_exchange_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (mut session, probes) = ScriptedSession::new(events_tx, granted_exchange("XYZ"));
    session.duplicate_consent = true;

    let outcome = run_flow(session, events_rx, dir.path().join("cookies.json"))
        .await
        .expect("flow succeeds");

    assert_eq!(outcome.oauth_token, "XYZ");
    assert_eq!(outcome.record["open_id"], "user-1");

    // Duplicate consent navigation must not fire a second exchange.
    assert_eq!(probes.script_runs.load(Ordering::SeqCst), 1);
    assert!(probes.closed.load(Ordering::SeqCst));

    // Second navigation is the forced consent hop carrying the challenge.
    let navigations = probes.navigations.lock().unwrap();
    assert_eq!(navigations.len(), 2);
    assert!(navigations[0].contains("tiktok.com/login"));
    assert!(navigations[1].contains("code_challenge="));
}

#[tokio::test(start_paused = true)]
async fn window_closed_before_capture_is_a_distinct_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (mut session, probes) = ScriptedSession::new(events_tx, granted_exchange("unused"));
    session.close_on_login = true;

    let err = run_flow(session, events_rx, dir.path().join("cookies.json"))
        .await
        .expect_err("flow fails");

    assert_eq!(err.code(), "WINDOW_CLOSED");
    assert_eq!(probes.script_runs.load(Ordering::SeqCst), 0);
    assert!(probes.closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn stalled_session_times_out_and_closes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (mut session, probes) = ScriptedSession::new(events_tx, granted_exchange("unused"));
    session.silent_login = true;

    let err = run_flow(session, events_rx, dir.path().join("cookies.json"))
        .await
        .expect_err("flow times out");

    assert_eq!(err.code(), "FLOW_TIMEOUT");
    assert_eq!(probes.script_runs.load(Ordering::SeqCst), 0);
    assert!(probes.closed.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn manual_authorize_action_forces_the_consent_hop_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (mut session, probes) = ScriptedSession::new(events_tx.clone(), granted_exchange("XYZ"));
    session.silent_login = true;

    // The user clicks the injected control before any logged-in navigation
    // is ever observed; a double click must not fire a second hop.
    let force_authorize = || {
        let _ = events_tx.send(FlowEvent::Inbound(IpcMessage {
            body: IpcPayload::UserAction(json!({ "action": "force-authorize" })),
            id: None,
            timestamp: None,
        }));
    };
    force_authorize();
    force_authorize();

    let outcome = run_flow(session, events_rx, dir.path().join("cookies.json"))
        .await
        .expect("flow succeeds");
    assert_eq!(outcome.oauth_token, "XYZ");
    assert!(probes.closed.load(Ordering::SeqCst));

    let navigations = probes.navigations.lock().unwrap();
    let consent_hops = navigations
        .iter()
        .filter(|url| url.contains("code_challenge="))
        .count();
    assert_eq!(consent_hops, 1);
}

#[tokio::test(start_paused = true)]
async fn exchange_reporting_failure_fails_the_attempt() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let report = json!({
        "success": true,
        "status": 200,
        "data": { "success": false, "message": "denied" }
    });
    let (session, _probes) = ScriptedSession::new(events_tx, report);

    let err = run_flow(session, events_rx, dir.path().join("cookies.json"))
        .await
        .expect_err("flow fails");
    assert_eq!(err.code(), "EXCHANGE_FAILED");
}

#[tokio::test(start_paused = true)]
async fn non_json_exchange_body_is_a_parse_failure_with_the_raw_body() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let report = json!({ "success": true, "status": 502, "body": "<html>bad gateway</html>" });
    let (session, _probes) = ScriptedSession::new(events_tx, report);

    let err = run_flow(session, events_rx, dir.path().join("cookies.json"))
        .await
        .expect_err("flow fails");
    assert_eq!(err.code(), "EXCHANGE_PARSE");
    assert!(err.to_string().contains("bad gateway"));
}

#[tokio::test(start_paused = true)]
async fn cookie_snapshot_is_persisted_before_the_exchange() {
    let dir = tempfile::tempdir().expect("tempdir");
    let jar = dir.path().join("cookies.json");
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (mut session, _probes) = ScriptedSession::new(events_tx, granted_exchange("XYZ"));
    session.cookie_snapshot = Some(vec![SessionCookie {
        name: "sessionid".to_string(),
        value: "s1".to_string(),
        domain: "www.tiktok.com".to_string(),
        path: "/".to_string(),
        secure: true,
        http_only: false,
        expiration_date: None,
    }]);

    run_flow(session, events_rx, jar.clone())
        .await
        .expect("flow succeeds");

    let saved = tiktok_live_hub_lib::test_support::cookie_store::load(&jar);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].name, "sessionid");
}

#[tokio::test(start_paused = true)]
async fn manager_persists_the_acquired_record_and_prefers_the_cache_afterwards() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = AuthManager::new(dir.path());

    let token = manager
        .retrieve_token(|events| {
            let (mut session, _probes) = ScriptedSession::new(events, granted_exchange("XYZ"));
            session.duplicate_consent = true;
            Ok(session)
        })
        .await
        .expect("acquisition succeeds");
    assert_eq!(token, "XYZ");

    let cached = token_cache::load(&dir.path().join("tokens.json")).expect("cache written");
    assert_eq!(cached["oauth_token"], "XYZ");
    assert_eq!(cached["open_id"], "user-1");

    // Second call must not open a session at all.
    let token = manager
        .retrieve_token(|_events| -> AppResult<ScriptedSession> {
            panic!("cache hit must not open a session")
        })
        .await
        .expect("cache hit");
    assert_eq!(token, "XYZ");
}
