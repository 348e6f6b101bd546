//! Usage: Tauri webview implementation of the flow's browser session seam.
//!
//! Wires three producers onto one flow event channel: the builder's
//! full-load navigation hook, the injected in-page history hook, and the
//! typed message router listening on the page script's emit channel.

use crate::auth::cookie_store::SessionCookie;
use crate::auth::ipc::{IpcMessage, MessageKind, MessageRouter, IPC_CHANNEL};
use crate::auth::login_flow::{BrowserSession, FlowEvent, NavigationEvent};
use crate::shared::error::AppResult;
use serde_json::json;
use tauri::{Listener, Manager, WebviewUrl, WebviewWindowBuilder};
use tokio::sync::mpsc;

pub(crate) const LOGIN_WINDOW_LABEL: &str = "tiktok-login";

/// Channel for the injected history hook; separate from the typed router.
const PAGE_NAV_EVENT: &str = "page-navigation";

const PROVIDER_ORIGIN: &str = "https://www.tiktok.com/";

pub(crate) struct WebviewLoginSession {
    window: tauri::WebviewWindow,
}

pub(crate) fn open_login_session(
    app: &tauri::AppHandle,
    events: mpsc::UnboundedSender<FlowEvent>,
) -> AppResult<WebviewLoginSession> {
    if let Some(stale) = app.get_webview_window(LOGIN_WINDOW_LABEL) {
        tracing::warn!("closing stale login window from a previous attempt");
        let _ = stale.close();
    }

    let origin: tauri::Url = PROVIDER_ORIGIN
        .parse()
        .map_err(|e| format!("SYSTEM_ERROR: provider origin unparseable: {e}"))?;

    let nav_events = events.clone();
    let window = WebviewWindowBuilder::new(app, LOGIN_WINDOW_LABEL, WebviewUrl::External(origin))
        .title("TikTok Login")
        .inner_size(450.0, 700.0)
        .center()
        .always_on_top(true)
        .initialization_script(PAGE_HOOK_SCRIPT)
        .on_navigation(move |url| {
            let _ = nav_events.send(FlowEvent::Navigated(NavigationEvent {
                url: url.to_string(),
                during_page_load: true,
            }));
            true
        })
        .build()
        .map_err(|e| format!("SYSTEM_ERROR: login window creation failed: {e}"))?;

    let history_events = events.clone();
    window.listen(PAGE_NAV_EVENT, move |event| {
        let url = event_text(event.payload());
        if url.is_empty() {
            return;
        }
        let _ = history_events.send(FlowEvent::Navigated(NavigationEvent {
            url,
            during_page_load: false,
        }));
    });

    let router = build_flow_router(events.clone());
    window.listen(IPC_CHANNEL, move |event| {
        router.dispatch(&event_text(event.payload()));
    });

    // Closing the window is the only cancellation gesture the user has.
    let close_events = events;
    window.on_window_event(move |event| {
        if matches!(
            event,
            tauri::WindowEvent::CloseRequested { .. } | tauri::WindowEvent::Destroyed
        ) {
            let _ = close_events.send(FlowEvent::WindowClosed);
        }
    });

    Ok(WebviewLoginSession { window })
}

/// JS `emit(name, someString)` arrives as a JSON-encoded string; unwrap one
/// layer so the router sees the text the page actually produced.
fn event_text(payload: &str) -> String {
    serde_json::from_str::<String>(payload).unwrap_or_else(|_| payload.to_string())
}

fn build_flow_router(events: mpsc::UnboundedSender<FlowEvent>) -> MessageRouter {
    let mut router = MessageRouter::new();
    for kind in [
        MessageKind::WindowContext,
        MessageKind::UserAction,
        MessageKind::LogEvent,
        MessageKind::RawString,
    ] {
        let tx = events.clone();
        router.register(kind, move |message: &IpcMessage| {
            tx.send(FlowEvent::Inbound(message.clone()))
                .map_err(|_| "SYSTEM_ERROR: flow event channel closed".into())
        });
    }
    router.on_parse_error(|raw, err| {
        tracing::warn!(raw_len = raw.len(), "malformed login window message: {err}");
    });
    router
}

impl BrowserSession for WebviewLoginSession {
    fn navigate(&self, url: &str) -> AppResult<()> {
        let parsed: tauri::Url = url
            .parse()
            .map_err(|e| format!("SYSTEM_ERROR: navigation target unparseable: {e}"))?;
        let mut window = self.window.clone();
        window
            .navigate(parsed)
            .map_err(|e| format!("SYSTEM_ERROR: navigation failed: {e}").into())
    }

    fn current_url(&self) -> AppResult<String> {
        self.window
            .url()
            .map(|url| url.to_string())
            .map_err(|e| format!("SYSTEM_ERROR: current URL unavailable: {e}").into())
    }

    fn preload_cookies(&self, cookies: &[SessionCookie]) -> AppResult<()> {
        let script = build_cookie_preload_script(cookies)?;
        self.window
            .eval(script.as_str())
            .map_err(|e| format!("SYSTEM_ERROR: cookie preload script failed: {e}").into())
    }

    fn run_script(&self, script: &str) -> AppResult<()> {
        self.window
            .eval(script)
            .map_err(|e| format!("SYSTEM_ERROR: script injection failed: {e}").into())
    }

    fn close(&self) {
        let _ = self.window.close();
    }
}

/// `document.cookie` only reaches the current origin, so each entry carries
/// its host and the page script skips the rest.
fn build_cookie_preload_script(cookies: &[SessionCookie]) -> AppResult<String> {
    let entries: Vec<_> = cookies
        .iter()
        .map(|cookie| {
            let mut header = format!(
                "{}={}; path={}; domain={}",
                cookie.name, cookie.value, cookie.path, cookie.domain
            );
            if cookie.secure {
                header.push_str("; secure");
            }
            json!({ "host": cookie.normalized_domain(), "header": header })
        })
        .collect();
    let entries_js = serde_json::to_string(&entries)
        .map_err(|e| format!("SYSTEM_ERROR: cookie entries serialize failed: {e}"))?;

    Ok(format!(
        r#"(function () {{
  var entries = {entries_js};
  entries.forEach(function (entry) {{
    if (window.location.hostname.indexOf(entry.host) !== -1) {{
      document.cookie = entry.header;
    }}
  }});
}})();"#
    ))
}

/// Injected before every page load. Reports history-API and popstate URL
/// changes, periodically snapshots the visible cookie state, and adds a
/// manual "Authorize" control on the provider domain as an escape hatch for
/// login forms that never redirect.
const PAGE_HOOK_SCRIPT: &str = r#"(function () {
  if (window.__liveHubHooked || !window.__TAURI__ || !window.__TAURI__.event) { return; }
  window.__liveHubHooked = true;
  var emit = function (name, payload) { window.__TAURI__.event.emit(name, payload); };

  var reportNav = function () {
    emit("page-navigation", window.location.href);
  };
  var wrap = function (name) {
    var original = history[name];
    history[name] = function () {
      var result = original.apply(this, arguments);
      reportNav();
      return result;
    };
  };
  wrap("pushState");
  wrap("replaceState");
  window.addEventListener("popstate", reportNav);

  var snapshot = function () {
    var cookies = document.cookie.split("; ").filter(Boolean).map(function (pair) {
      var idx = pair.indexOf("=");
      return {
        name: pair.slice(0, idx),
        value: pair.slice(idx + 1),
        domain: window.location.hostname,
        path: "/",
        secure: window.location.protocol === "https:",
        httpOnly: false
      };
    });
    emit("ipc-message", JSON.stringify({
      type: "WINDOW_CONTEXT",
      payload: { url: window.location.href, cookies: cookies }
    }));
  };
  snapshot();
  setInterval(snapshot, 2000);

  if (window.location.hostname.indexOf("tiktok.com") !== -1) {
    var addControl = function () {
      if (document.getElementById("live-hub-authorize") || !document.body) { return; }
      var btn = document.createElement("button");
      btn.id = "live-hub-authorize";
      btn.textContent = "Authorize Streamlabs";
      btn.style.cssText = "position:fixed;bottom:16px;right:16px;z-index:2147483647;" +
        "padding:10px 14px;background:#fe2c55;color:#fff;border:0;border-radius:6px;cursor:pointer;";
      btn.addEventListener("click", function () {
        emit("ipc-message", JSON.stringify({
          type: "USER_ACTION",
          payload: { action: "force-authorize" }
        }));
      });
      document.body.appendChild(btn);
    };
    if (document.readyState === "loading") {
      document.addEventListener("DOMContentLoaded", addControl);
    } else {
      addControl();
    }
  }
})();"#;
