//! Integration tests for the REST collaborators: login, chat listing, chat
//! details, and message send validation.

use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Start the server on a random port and return its base URL.
async fn start_test_server() -> String {
    let store = banter_server::store::Store::new();
    store.seed_demo_data();
    let state = banter_server::state::AppState::new(store);
    let app = banter_server::routes::build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_login_returns_user_id() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/login", base_url))
        .json(&json!({"username": "alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["username"], "alice");
    let user_id = body["userId"].as_str().unwrap();
    assert!(user_id.starts_with("user_"), "got user id {user_id}");
}

#[tokio::test]
async fn test_login_validation() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/login", base_url))
        .json(&json!({"username": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400, "blank username rejected");

    let resp = client
        .post(format!("{}/api/login", base_url))
        .json(&json!({"username": "x".repeat(51)}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400, "over-long username rejected");
}

#[tokio::test]
async fn test_list_chats_requires_user_id() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/chats", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .get(format!("{}/api/chats?userId=u1", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    let ids: Vec<&str> = body["chats"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"chat_1"));
    assert!(ids.contains(&"chat_2"));
    assert!(ids.contains(&"chat_3"));
}

#[tokio::test]
async fn test_chat_details_marks_own_messages() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/chats/chat_1?userId=alice_id", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["chat"]["id"], "chat_1");
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    for msg in messages {
        let own = msg["isOwnMessage"].as_bool().unwrap();
        assert_eq!(own, msg["senderId"] == "alice_id");
    }
}

#[tokio::test]
async fn test_chat_details_unknown_chat() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/chats/chat_404", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_send_message_validation() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/chats/chat_404/messages", base_url))
        .json(&json!({"text": "hi", "senderId": "u1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404, "unknown chat");

    let resp = client
        .post(format!("{}/api/chats/chat_1/messages", base_url))
        .json(&json!({"text": "  ", "senderId": "u1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400, "blank text");

    let resp = client
        .post(format!("{}/api/chats/chat_1/messages", base_url))
        .json(&json!({"text": "y".repeat(1001), "senderId": "u1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400, "over-long text");
}

#[tokio::test]
async fn test_send_message_persists_and_updates_chat() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/chats/chat_2/messages", base_url))
        .json(&json!({"text": "shipping it", "senderId": "u1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let msg_id = body["message"]["id"].as_str().unwrap();
    assert!(msg_id.starts_with("msg_"));
    // sender never logged in, display name falls back
    assert_eq!(body["message"]["sender"], "Unknown");

    let resp = client
        .get(format!("{}/api/chats/chat_2?userId=u1", base_url))
        .send()
        .await
        .unwrap();
    let details: Value = resp.json().await.unwrap();
    assert_eq!(details["chat"]["lastMessage"], "shipping it");
    let messages = details["messages"].as_array().unwrap();
    let appended = messages.last().unwrap();
    assert_eq!(appended["text"], "shipping it");
    assert_eq!(appended["isOwnMessage"], true);
}
