//! Fan-out helpers for chat events.
//! Wraps domain events in protocol frames and broadcasts them to a chat's
//! live subscribers, excluding the originating sender. Best-effort: callers
//! never observe per-recipient delivery failures.

use chrono::{DateTime, Utc};

use crate::store::ChatMessage;
use crate::ws::protocol::{Frame, ServerEvent};
use crate::ws::ConnectionManager;

/// Broadcast a `new_message` event to a chat's subscribers.
pub fn broadcast_new_message(
    manager: &ConnectionManager,
    chat_id: &str,
    message: ChatMessage,
    exclude_user: &str,
) {
    let frame = Frame::new(ServerEvent::NewMessage {
        chat_id: chat_id.to_string(),
        message,
    });
    manager.broadcast_to_chat(chat_id, &frame, Some(exclude_user));
}

/// Broadcast a `chat_update` event (new last message) to a chat's subscribers.
pub fn broadcast_chat_update(
    manager: &ConnectionManager,
    chat_id: &str,
    last_message: &str,
    last_message_time: DateTime<Utc>,
    exclude_user: &str,
) {
    let frame = Frame::new(ServerEvent::ChatUpdate {
        chat_id: chat_id.to_string(),
        last_message: last_message.to_string(),
        last_message_time,
        unread_count: None,
    });
    manager.broadcast_to_chat(chat_id, &frame, Some(exclude_user));
}
