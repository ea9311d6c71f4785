//! REST endpoint for sending a message to a chat.
//!
//! Persists to the store first, then fires best-effort broadcasts to the
//! chat's live subscribers. Delivery failures never surface here.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::broadcast;
use crate::state::AppState;
use crate::store::ChatMessage;

/// Maximum message text length (chars).
const MAX_TEXT_LENGTH: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub text: String,
    pub sender_id: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: ChatMessage,
}

/// POST /api/chats/{chatId}/messages
pub async fn send_message(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, StatusCode> {
    if !state.store.chats.contains_key(&chat_id) {
        return Err(StatusCode::NOT_FOUND);
    }
    if body.text.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if body.text.chars().count() > MAX_TEXT_LENGTH {
        return Err(StatusCode::BAD_REQUEST);
    }

    let sender = state.store.username_or_unknown(&body.sender_id);
    let message = ChatMessage {
        id: format!("msg_{}", &Uuid::new_v4().simple().to_string()[..8]),
        text: body.text.clone(),
        sender,
        sender_id: body.sender_id.clone(),
        timestamp: Utc::now(),
        is_own_message: false,
    };

    // Persist: append to the history and roll the chat's last-message fields
    state
        .store
        .messages
        .entry(chat_id.clone())
        .or_default()
        .push(message.clone());
    if let Some(mut chat) = state.store.chats.get_mut(&chat_id) {
        chat.last_message = Some(body.text.clone());
        chat.last_message_time = Some(message.timestamp);
    }

    // Fan out to live subscribers, excluding the sender
    broadcast::broadcast_new_message(&state.manager, &chat_id, message.clone(), &body.sender_id);
    broadcast::broadcast_chat_update(
        &state.manager,
        &chat_id,
        &body.text,
        message.timestamp,
        &body.sender_id,
    );

    // The sender's own copy is marked as theirs
    let mut own = message;
    own.is_own_message = true;
    Ok(Json(SendMessageResponse {
        success: true,
        message: own,
    }))
}
