//! REST endpoints for chat listing and chat details.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::store::{Chat, ChatMessage};

#[derive(Debug, Deserialize)]
pub struct ChatsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatsResponse {
    pub success: bool,
    pub chats: Vec<Chat>,
}

#[derive(Debug, Serialize)]
pub struct ChatDetailsResponse {
    pub success: bool,
    pub chat: Chat,
    pub messages: Vec<ChatMessage>,
}

/// GET /api/chats?userId=...
/// List all chats. The user id is required but chats are not yet filtered
/// per user.
pub async fn get_chats(
    State(state): State<AppState>,
    Query(params): Query<ChatsQuery>,
) -> Result<Json<ChatsResponse>, StatusCode> {
    if params.user_id.as_deref().unwrap_or("").is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let chats: Vec<Chat> = state.store.chats.iter().map(|e| e.value().clone()).collect();

    Ok(Json(ChatsResponse { success: true, chats }))
}

/// GET /api/chats/{chatId}?userId=...
/// Chat details plus full message history. `isOwnMessage` is computed per
/// message against the requesting user.
pub async fn get_chat_details(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Query(params): Query<ChatsQuery>,
) -> Result<Json<ChatDetailsResponse>, StatusCode> {
    let chat = state
        .store
        .chats
        .get(&chat_id)
        .map(|e| e.value().clone())
        .ok_or(StatusCode::NOT_FOUND)?;

    let user_id = params.user_id.unwrap_or_default();
    let messages = state
        .store
        .messages
        .get(&chat_id)
        .map(|e| e.value().clone())
        .unwrap_or_default()
        .into_iter()
        .map(|mut msg| {
            msg.is_own_message = !user_id.is_empty() && msg.sender_id == user_id;
            msg
        })
        .collect();

    Ok(Json(ChatDetailsResponse {
        success: true,
        chat,
        messages,
    }))
}
