use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::auth;
use crate::chat::{chats, messages};
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// GET / — service info, mirrors what a frontend probes for.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Chat API Server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/login", axum::routing::post(auth::login))
        .route("/api/chats", axum::routing::get(chats::get_chats))
        .route("/api/chats/{chat_id}", axum::routing::get(chats::get_chat_details))
        .route(
            "/api/chats/{chat_id}/messages",
            axum::routing::post(messages::send_message),
        );

    // WebSocket endpoint (identified via ?userId= query param)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    let public_routes = Router::new()
        .route("/", axum::routing::get(root))
        .route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(api_routes)
        .merge(ws_routes)
        .merge(public_routes)
        // Browser frontend runs on a separate origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
