use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for the WebSocket endpoint. The user id is the only
/// credential; presence of the parameter is the whole auth story.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// 1008 = policy violation, sent when the required userId is missing.
const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// GET /ws?userId=...
/// WebSocket upgrade endpoint. A missing or empty userId is accepted at the
/// HTTP level and then immediately closed with code 1008, so the client
/// sees a proper close reason rather than a failed upgrade.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match params.user_id.filter(|id| !id.is_empty()) {
        Some(user_id) => {
            tracing::info!(user_id = %user_id, "WebSocket connection accepted");
            ws.on_upgrade(move |socket| actor::run_connection(socket, state, user_id))
        }
        None => {
            tracing::warn!("WebSocket upgrade without userId, closing with 1008");
            ws.on_upgrade(move |mut socket| async move {
                let close_frame = CloseFrame {
                    code: CLOSE_POLICY_VIOLATION,
                    reason: "userId query parameter is required".into(),
                };
                let _ = socket.send(Message::Close(Some(close_frame))).await;
            })
        }
    }
}
