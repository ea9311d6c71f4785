//! JSON wire protocol: outbound frame types, inbound classification, and
//! per-frame dispatch for the connection read loop.

use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AppState;
use crate::store::ChatMessage;
use crate::ws::ConnectionSender;

// --- Outbound frames ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

/// Server-to-client event payload, tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    NewMessage { chat_id: String, message: ChatMessage },
    #[serde(rename_all = "camelCase")]
    ChatUpdate {
        chat_id: String,
        last_message: String,
        last_message_time: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        unread_count: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    UserTyping {
        chat_id: String,
        user_id: String,
        username: String,
        is_typing: bool,
    },
    #[serde(rename_all = "camelCase")]
    Connected { user_id: String, message: String },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SubscriptionConfirmed {
        action: SubscriptionAction,
        chat_id: String,
        message: String,
    },
}

/// One outbound frame: an event plus its creation timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    #[serde(flatten)]
    pub event: ServerEvent,
    pub timestamp: DateTime<Utc>,
}

impl Frame {
    /// Build a frame stamped with the current time.
    pub fn new(event: ServerEvent) -> Self {
        Self::at(event, Utc::now())
    }

    /// Build a frame with an injected timestamp (testable construction).
    pub fn at(event: ServerEvent, timestamp: DateTime<Utc>) -> Self {
        Frame { event, timestamp }
    }

    /// Serialize to a WebSocket text message. None if serialization fails.
    pub fn to_message(&self) -> Option<Message> {
        serde_json::to_string(self)
            .ok()
            .map(|text| Message::Text(text.into()))
    }
}

// --- Inbound frames ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCommand {
    pub action: SubscriptionAction,
    pub chat_id: String,
}

/// Classification of one decoded inbound frame.
#[derive(Debug)]
pub enum ClientCommand {
    Subscription(SubscriptionCommand),
    Typing {
        chat_id: Option<String>,
        is_typing: bool,
    },
    /// Matched a known shape but failed to parse (e.g. a bad `action` value).
    Invalid(String),
    /// No recognized shape.
    Unknown,
}

/// Classify a decoded frame by shape: a frame carrying both `action` and
/// `chatId` is a subscription command; a `type` of "typing" is a typing
/// indicator; anything else is unknown.
pub fn classify_frame(value: &Value) -> ClientCommand {
    if value.get("action").is_some() && value.get("chatId").is_some() {
        match serde_json::from_value::<SubscriptionCommand>(value.clone()) {
            Ok(cmd) => ClientCommand::Subscription(cmd),
            Err(e) => ClientCommand::Invalid(e.to_string()),
        }
    } else if value.get("type").and_then(Value::as_str) == Some("typing") {
        ClientCommand::Typing {
            chat_id: value
                .get("chatId")
                .and_then(Value::as_str)
                .map(str::to_string),
            is_typing: value.get("isTyping").and_then(Value::as_bool).unwrap_or(true),
        }
    } else {
        ClientCommand::Unknown
    }
}

// --- Inbound dispatch ---

/// Handle one incoming text frame from a connection's read loop.
/// Every failure here is recoverable: the client gets an `error` frame and
/// the connection stays open. Only a transport-level error ends the loop,
/// and that is the caller's concern.
pub fn handle_text_frame(text: &str, tx: &ConnectionSender, state: &AppState, user_id: &str) {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Malformed inbound frame");
            send_error(tx, "Invalid JSON", Some("Could not parse message as JSON"));
            return;
        }
    };

    match classify_frame(&value) {
        ClientCommand::Subscription(cmd) => {
            handle_subscription(&cmd, tx, state, user_id);
        }
        ClientCommand::Typing { chat_id, is_typing } => {
            handle_typing(chat_id, is_typing, state, user_id);
        }
        ClientCommand::Invalid(details) => {
            tracing::warn!(user_id = %user_id, details = %details, "Invalid inbound frame");
            send_error(tx, "Processing error", Some(&details));
        }
        ClientCommand::Unknown => {
            tracing::debug!(user_id = %user_id, "Unknown inbound frame shape");
            send_error(tx, "Unknown message type", Some(&format!("Received: {value}")));
        }
    }
}

/// Apply a subscribe/unsubscribe command and confirm it back to the client.
fn handle_subscription(
    cmd: &SubscriptionCommand,
    tx: &ConnectionSender,
    state: &AppState,
    user_id: &str,
) {
    let message = match cmd.action {
        SubscriptionAction::Subscribe => {
            state.manager.subscribe(user_id, &cmd.chat_id);
            format!("Subscribed to chat {}", cmd.chat_id)
        }
        SubscriptionAction::Unsubscribe => {
            state.manager.unsubscribe(user_id, &cmd.chat_id);
            format!("Unsubscribed from chat {}", cmd.chat_id)
        }
    };
    send_frame(
        tx,
        &Frame::new(ServerEvent::SubscriptionConfirmed {
            action: cmd.action,
            chat_id: cmd.chat_id.clone(),
            message,
        }),
    );
}

/// Fan a typing indicator out to the chat's other subscribers. An indicator
/// without a chat id is dropped.
fn handle_typing(chat_id: Option<String>, is_typing: bool, state: &AppState, user_id: &str) {
    let Some(chat_id) = chat_id else {
        tracing::debug!(user_id = %user_id, "Typing indicator without chatId, ignoring");
        return;
    };
    let username = state.store.username_or_unknown(user_id);
    let frame = Frame::new(ServerEvent::UserTyping {
        chat_id: chat_id.clone(),
        user_id: user_id.to_string(),
        username,
        is_typing,
    });
    state.manager.broadcast_to_chat(&chat_id, &frame, Some(user_id));
}

/// Serialize and enqueue a frame on one connection. Enqueue failures are
/// ignored here; the registry prunes dead connections on its own deliveries
/// and the read loop tears down on transport close.
pub fn send_frame(tx: &ConnectionSender, frame: &Frame) {
    if let Some(msg) = frame.to_message() {
        let _ = tx.send(msg);
    }
}

/// Send an `error` frame to one connection.
pub fn send_error(tx: &ConnectionSender, error: &str, details: Option<&str>) {
    send_frame(
        tx,
        &Frame::new(ServerEvent::Error {
            error: error.to_string(),
            details: details.map(str::to_string),
        }),
    );
}
