//! Usage: Typed messages from the login webview and their dispatch router.
//!
//! The webview side is hostile territory: scripts race page teardown and can
//! emit partial or plain-string payloads. The router therefore never errors
//! outward. Non-JSON input becomes a RAW_STRING message, structurally invalid
//! JSON goes to a parse-error hook, and handler failures are logged and
//! swallowed so one bad message cannot take down the session.

use crate::shared::error::AppResult;
use crate::shared::time::now_unix_millis;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Event channel the injected page scripts emit on.
pub const IPC_CHANNEL: &str = "ipc-message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    WindowContext,
    UserAction,
    LogEvent,
    RawString,
}

#[derive(Debug, Clone)]
pub enum IpcPayload {
    WindowContext(Value),
    UserAction(Value),
    LogEvent(Value),
    RawString(Value),
}

#[derive(Debug, Clone)]
pub struct IpcMessage {
    pub body: IpcPayload,
    pub id: Option<String>,
    pub timestamp: Option<i64>,
}

/// Wire shape of a message as the page scripts emit it.
#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type")]
    kind: String,
    payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
}

impl IpcMessage {
    fn from_wire(envelope: WireEnvelope) -> Result<Self, serde_json::Error> {
        let body = match envelope.kind.as_str() {
            "WINDOW_CONTEXT" => IpcPayload::WindowContext(envelope.payload),
            "USER_ACTION" => IpcPayload::UserAction(envelope.payload),
            "LOG_EVENT" => IpcPayload::LogEvent(envelope.payload),
            "RAW_STRING" => IpcPayload::RawString(envelope.payload),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "unknown message type `{other}`"
                )))
            }
        };
        Ok(Self {
            body,
            id: envelope.id,
            timestamp: envelope.timestamp,
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self.body {
            IpcPayload::WindowContext(_) => MessageKind::WindowContext,
            IpcPayload::UserAction(_) => MessageKind::UserAction,
            IpcPayload::LogEvent(_) => MessageKind::LogEvent,
            IpcPayload::RawString(_) => MessageKind::RawString,
        }
    }

    pub fn payload(&self) -> &Value {
        match &self.body {
            IpcPayload::WindowContext(payload)
            | IpcPayload::UserAction(payload)
            | IpcPayload::LogEvent(payload)
            | IpcPayload::RawString(payload) => payload,
        }
    }
}

fn new_message_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Every message reaching a handler carries an id and a timestamp.
fn enrich(mut message: IpcMessage) -> IpcMessage {
    message.id.get_or_insert_with(new_message_id);
    message.timestamp.get_or_insert_with(now_unix_millis);
    message
}

fn synthesize_raw(text: &str) -> IpcMessage {
    IpcMessage {
        body: IpcPayload::RawString(json!({
            "data": text,
            "received_at": now_unix_millis(),
        })),
        id: Some(new_message_id()),
        timestamp: Some(now_unix_millis()),
    }
}

type Handler = Box<dyn Fn(&IpcMessage) -> AppResult<()> + Send + Sync>;
type ParseErrorHook = Box<dyn Fn(&str, &serde_json::Error) + Send + Sync>;
type UnhandledHook = Box<dyn Fn(&IpcMessage) + Send + Sync>;

#[derive(Default)]
pub struct MessageRouter {
    handlers: HashMap<MessageKind, Handler>,
    on_parse_error: Option<ParseErrorHook>,
    on_unhandled: Option<UnhandledHook>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: MessageKind, handler: F)
    where
        F: Fn(&IpcMessage) -> AppResult<()> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    pub fn unregister(&mut self, kind: MessageKind) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    pub fn on_parse_error<F>(&mut self, hook: F)
    where
        F: Fn(&str, &serde_json::Error) + Send + Sync + 'static,
    {
        self.on_parse_error = Some(Box::new(hook));
    }

    pub fn on_unhandled_message<F>(&mut self, hook: F)
    where
        F: Fn(&IpcMessage) + Send + Sync + 'static,
    {
        self.on_unhandled = Some(Box::new(hook));
    }

    pub fn dispatch(&self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }

        let value: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(_) => {
                // Plain text still reaches a handler, wrapped as RAW_STRING.
                self.deliver(&synthesize_raw(trimmed));
                return;
            }
        };

        let parsed = serde_json::from_value::<WireEnvelope>(value).and_then(IpcMessage::from_wire);
        let message = match parsed {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(raw_len = trimmed.len(), "malformed webview message: {err}");
                if let Some(hook) = &self.on_parse_error {
                    hook(trimmed, &err);
                }
                return;
            }
        };

        self.deliver(&enrich(message));
    }

    /// Splits batched text on `delimiter` and dispatches each segment
    /// independently; a bad segment never blocks the rest.
    pub fn handle_multiple(&self, text: &str, delimiter: &str) {
        for segment in text.split(delimiter) {
            if segment.trim().is_empty() {
                continue;
            }
            self.dispatch(segment);
        }
    }

    fn deliver(&self, message: &IpcMessage) {
        match self.handlers.get(&message.kind()) {
            Some(handler) => {
                if let Err(err) = handler(message) {
                    tracing::warn!(kind = ?message.kind(), "message handler failed: {err}");
                }
            }
            None => match &self.on_unhandled {
                Some(hook) => hook(message),
                None => tracing::debug!(kind = ?message.kind(), "no handler registered"),
            },
        }
    }
}
