//! In-memory keyed store for users, chats, and message histories.
//!
//! The fan-out subsystem never touches this directly except to resolve
//! display names; the REST handlers own all reads and writes.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Placeholder display name when a sender is not in the user store.
pub const UNKNOWN_USERNAME: &str = "Unknown";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub name: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub unread_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: String,
    pub sender_id: String,
    pub timestamp: DateTime<Utc>,
    pub is_own_message: bool,
}

/// Keyed in-memory store. Each map is independently concurrent; there are
/// no cross-map transactions (single-process demo backing store).
#[derive(Default)]
pub struct Store {
    /// user id -> username
    pub users: DashMap<String, String>,
    /// chat id -> chat record
    pub chats: DashMap<String, Chat>,
    /// chat id -> ordered message history
    pub messages: DashMap<String, Vec<ChatMessage>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a user id to its display name, falling back to the
    /// "Unknown" placeholder for ids that never logged in.
    pub fn username_or_unknown(&self, user_id: &str) -> String {
        self.users
            .get(user_id)
            .map(|name| name.clone())
            .unwrap_or_else(|| UNKNOWN_USERNAME.to_string())
    }

    /// Seed the demo chats and histories the service boots with.
    pub fn seed_demo_data(&self) {
        let now = Utc::now();

        let chats = [
            ("chat_1", "General", "Welcome to the general chat!", now - Duration::minutes(5)),
            ("chat_2", "Tech Talk", "Anyone working on React projects?", now - Duration::minutes(30)),
            ("chat_3", "Random", "Happy coding!", now - Duration::hours(2)),
        ];
        for (id, name, last_message, last_message_time) in chats {
            self.chats.insert(
                id.to_string(),
                Chat {
                    id: id.to_string(),
                    name: name.to_string(),
                    last_message: Some(last_message.to_string()),
                    last_message_time: Some(last_message_time),
                    unread_count: Some(0),
                },
            );
        }

        let histories: [(&str, &[(&str, &str, &str, &str, DateTime<Utc>)]); 3] = [
            (
                "chat_1",
                &[
                    ("msg_1_1", "Welcome to the general chat!", "admin", "admin_id", now - Duration::hours(1)),
                    ("msg_1_2", "Thanks! Happy to be here.", "alice", "alice_id", now - Duration::minutes(50)),
                    ("msg_1_3", "Hello everyone!", "bob", "bob_id", now - Duration::minutes(5)),
                ],
            ),
            (
                "chat_2",
                &[
                    ("msg_2_1", "Anyone working on React projects?", "charlie", "charlie_id", now - Duration::minutes(30)),
                    ("msg_2_2", "I am! Building a chat app.", "dave", "dave_id", now - Duration::minutes(25)),
                ],
            ),
            (
                "chat_3",
                &[("msg_3_1", "Happy coding!", "eve", "eve_id", now - Duration::hours(2))],
            ),
        ];
        for (chat_id, msgs) in histories {
            let history = msgs
                .iter()
                .map(|(id, text, sender, sender_id, timestamp)| ChatMessage {
                    id: id.to_string(),
                    text: text.to_string(),
                    sender: sender.to_string(),
                    sender_id: sender_id.to_string(),
                    timestamp: *timestamp,
                    is_own_message: false,
                })
                .collect();
            self.messages.insert(chat_id.to_string(), history);
        }
    }
}
