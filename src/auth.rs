//! Username-only login. No passwords, no sessions: the returned user id is
//! the opaque identifier the rest of the API and the WebSocket endpoint use.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

/// Maximum username length (chars).
const MAX_USERNAME_LENGTH: usize = 50;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user_id: String,
    pub username: String,
    pub message: Option<String>,
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    if body.username.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if body.username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user_id = format!("user_{}", &Uuid::new_v4().simple().to_string()[..8]);
    state.store.users.insert(user_id.clone(), body.username.clone());

    tracing::info!(user_id = %user_id, username = %body.username, "User logged in");

    Ok(Json(LoginResponse {
        success: true,
        user_id,
        username: body.username,
        message: Some("Login successful".to_string()),
    }))
}
