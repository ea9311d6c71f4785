//! Connection registry and chat subscription index.
//!
//! Both maps are guarded by a single mutex so the cross-map invariants hold
//! at every observation point: a user id is present in the registry iff it
//! has at least one live connection, and a chat id is present in the index
//! iff it has at least one subscriber. The last connection of a user going
//! away cascades through every subscription entry.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use axum::extract::ws::Message;
use tokio::sync::mpsc;

use crate::ws::protocol::Frame;

/// Sender half of a connection's outbound channel. Cloned by anything that
/// wants to push frames to that client; enqueue is non-blocking and fails
/// only once the connection's writer task is gone.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

#[derive(Default)]
struct Inner {
    /// user id -> live connection senders (one per device/tab)
    connections: HashMap<String, Vec<ConnectionSender>>,
    /// chat id -> subscribed user ids
    subscriptions: HashMap<String, HashSet<String>>,
}

/// Shared connection manager, constructed once at startup and handed to
/// every connection task and REST handler through the application state.
#[derive(Default)]
pub struct ConnectionManager {
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under a user id, creating the session if absent.
    pub fn connect(&self, user_id: &str, conn: ConnectionSender) {
        let Ok(mut inner) = self.inner.lock() else { return };
        let senders = inner.connections.entry(user_id.to_string()).or_default();
        senders.push(conn);
        tracing::debug!(
            user_id = %user_id,
            connections = senders.len(),
            "Connection registered"
        );
    }

    /// Remove a connection from a user's session. Idempotent: removing a
    /// connection that is already gone is a no-op. When the session becomes
    /// empty, the user is dropped from the registry and unsubscribed from
    /// every chat.
    pub fn disconnect(&self, user_id: &str, conn: &ConnectionSender) {
        let Ok(mut inner) = self.inner.lock() else { return };
        if let Some(senders) = inner.connections.get_mut(user_id) {
            senders.retain(|s| !s.same_channel(conn));
            if senders.is_empty() {
                inner.connections.remove(user_id);
                cascade_unsubscribe(&mut inner, user_id);
            }
        }
        tracing::debug!(user_id = %user_id, "Connection unregistered");
    }

    /// Subscribe a user to a chat. Idempotent.
    pub fn subscribe(&self, user_id: &str, chat_id: &str) {
        let Ok(mut inner) = self.inner.lock() else { return };
        inner
            .subscriptions
            .entry(chat_id.to_string())
            .or_default()
            .insert(user_id.to_string());
        tracing::debug!(user_id = %user_id, chat_id = %chat_id, "Subscribed to chat");
    }

    /// Unsubscribe a user from a chat. A pair that was never subscribed is a
    /// silent no-op. Drops the chat entry when its subscriber set empties.
    pub fn unsubscribe(&self, user_id: &str, chat_id: &str) {
        let Ok(mut inner) = self.inner.lock() else { return };
        if let Some(subscribers) = inner.subscriptions.get_mut(chat_id) {
            subscribers.remove(user_id);
            if subscribers.is_empty() {
                inner.subscriptions.remove(chat_id);
            }
        }
        tracing::debug!(user_id = %user_id, chat_id = %chat_id, "Unsubscribed from chat");
    }

    /// Snapshot of the current subscriber set for a chat. Mutations after
    /// the snapshot is taken are never observed by an in-flight broadcast.
    pub fn subscribers_of(&self, chat_id: &str) -> HashSet<String> {
        let Ok(inner) = self.inner.lock() else {
            return HashSet::new();
        };
        inner.subscriptions.get(chat_id).cloned().unwrap_or_default()
    }

    /// Snapshot of every user id with at least one live connection.
    pub fn connected_users(&self) -> Vec<String> {
        let Ok(inner) = self.inner.lock() else { return Vec::new() };
        inner.connections.keys().cloned().collect()
    }

    /// Number of live connections for a user (zero once the session is gone).
    pub fn connection_count(&self, user_id: &str) -> usize {
        let Ok(inner) = self.inner.lock() else { return 0 };
        inner.connections.get(user_id).map(Vec::len).unwrap_or(0)
    }

    /// Deliver a frame to every live connection of one user. A connection
    /// that refuses the enqueue is treated as dead and pruned (with the same
    /// cascade as an explicit disconnect); the failure never aborts delivery
    /// to the user's other connections.
    pub fn send_to_user(&self, user_id: &str, frame: &Frame) {
        let Some(msg) = frame.to_message() else { return };
        let Ok(mut inner) = self.inner.lock() else { return };
        deliver(&mut inner, user_id, &msg);
    }

    /// Broadcast a frame to every subscriber of a chat, optionally excluding
    /// one user (normally the originating sender). A chat with no live
    /// subscribers is a silent no-op.
    pub fn broadcast_to_chat(&self, chat_id: &str, frame: &Frame, exclude_user: Option<&str>) {
        let Some(msg) = frame.to_message() else { return };
        let subscribers = self.subscribers_of(chat_id);
        for user_id in &subscribers {
            if exclude_user == Some(user_id.as_str()) {
                continue;
            }
            let Ok(mut inner) = self.inner.lock() else { return };
            deliver(&mut inner, user_id, &msg);
        }
    }

    /// Broadcast a frame to every connected user (system-wide notices).
    pub fn broadcast_to_all(&self, frame: &Frame) {
        let Some(msg) = frame.to_message() else { return };
        for user_id in self.connected_users() {
            let Ok(mut inner) = self.inner.lock() else { return };
            deliver(&mut inner, &user_id, &msg);
        }
    }
}

/// Enqueue a message on each of a user's connections, pruning any that fail.
/// An emptied session is removed and cascaded out of the subscription index.
fn deliver(inner: &mut Inner, user_id: &str, msg: &Message) {
    let Some(senders) = inner.connections.get_mut(user_id) else {
        return;
    };
    let before = senders.len();
    senders.retain(|tx| tx.send(msg.clone()).is_ok());
    let pruned = before - senders.len();
    if pruned > 0 {
        tracing::warn!(
            user_id = %user_id,
            pruned = pruned,
            "Pruned dead connections during delivery"
        );
    }
    if senders.is_empty() {
        inner.connections.remove(user_id);
        cascade_unsubscribe(inner, user_id);
    }
}

/// Remove a user from every chat's subscriber set, dropping chats left empty.
fn cascade_unsubscribe(inner: &mut Inner, user_id: &str) {
    inner.subscriptions.retain(|_, subscribers| {
        subscribers.remove(user_id);
        !subscribers.is_empty()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::ServerEvent;
    use tokio::sync::mpsc;

    fn frame() -> Frame {
        Frame::new(ServerEvent::Error {
            error: "test".to_string(),
            details: None,
        })
    }

    fn channel() -> (ConnectionSender, mpsc::UnboundedReceiver<Message>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn disconnect_removes_empty_session() {
        let mgr = ConnectionManager::new();
        let (tx, _rx) = channel();
        mgr.connect("u1", tx.clone());
        assert_eq!(mgr.connection_count("u1"), 1);
        mgr.disconnect("u1", &tx);
        assert_eq!(mgr.connection_count("u1"), 0);
        assert!(mgr.connected_users().is_empty());
        // sending to a departed user is a no-op
        mgr.send_to_user("u1", &frame());
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mgr = ConnectionManager::new();
        let (tx, _rx) = channel();
        mgr.connect("u1", tx.clone());
        mgr.disconnect("u1", &tx);
        mgr.disconnect("u1", &tx);
        assert_eq!(mgr.connection_count("u1"), 0);
    }

    #[test]
    fn subscribe_is_idempotent() {
        let mgr = ConnectionManager::new();
        let (tx, _rx) = channel();
        mgr.connect("u1", tx);
        mgr.subscribe("u1", "chat_1");
        mgr.subscribe("u1", "chat_1");
        assert_eq!(mgr.subscribers_of("chat_1").len(), 1);
    }

    #[test]
    fn unsubscribe_absent_pair_is_noop() {
        let mgr = ConnectionManager::new();
        mgr.unsubscribe("u1", "chat_1");
        assert!(mgr.subscribers_of("chat_1").is_empty());
    }

    #[test]
    fn unsubscribe_drops_empty_chat_entry() {
        let mgr = ConnectionManager::new();
        let (tx, _rx) = channel();
        mgr.connect("u1", tx);
        mgr.subscribe("u1", "chat_1");
        mgr.unsubscribe("u1", "chat_1");
        assert!(mgr.subscribers_of("chat_1").is_empty());
    }

    #[test]
    fn dead_connection_pruned_sibling_still_delivered() {
        let mgr = ConnectionManager::new();
        let (tx_dead, rx_dead) = channel();
        let (tx_live, mut rx_live) = channel();
        mgr.connect("u1", tx_dead);
        mgr.connect("u1", tx_live);
        drop(rx_dead); // first connection's writer is gone

        mgr.send_to_user("u1", &frame());

        assert!(rx_live.try_recv().is_ok(), "live sibling should receive");
        assert_eq!(mgr.connection_count("u1"), 1, "dead connection pruned");
    }

    #[test]
    fn last_dead_connection_cascades_subscriptions() {
        let mgr = ConnectionManager::new();
        let (tx, rx) = channel();
        mgr.connect("u1", tx);
        mgr.subscribe("u1", "chat_1");
        drop(rx);

        mgr.send_to_user("u1", &frame());

        assert_eq!(mgr.connection_count("u1"), 0);
        assert!(mgr.subscribers_of("chat_1").is_empty());
    }

    #[test]
    fn broadcast_excludes_sender() {
        let mgr = ConnectionManager::new();
        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        mgr.connect("a", tx_a);
        mgr.connect("b", tx_b);
        mgr.subscribe("a", "chat_1");
        mgr.subscribe("b", "chat_1");

        mgr.broadcast_to_chat("chat_1", &frame(), Some("a"));

        assert!(rx_a.try_recv().is_err(), "excluded sender must not receive");
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn broadcast_to_all_reaches_every_user() {
        let mgr = ConnectionManager::new();
        let (tx_a, mut rx_a) = channel();
        let (tx_b, mut rx_b) = channel();
        mgr.connect("a", tx_a);
        mgr.connect("b", tx_b);

        mgr.broadcast_to_all(&frame());

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn broadcast_to_empty_chat_is_noop() {
        let mgr = ConnectionManager::new();
        mgr.broadcast_to_chat("chat_1", &frame(), None);
    }

    #[test]
    fn disconnect_cascades_across_all_chats() {
        let mgr = ConnectionManager::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        mgr.connect("u1", tx1.clone());
        mgr.connect("u2", tx2);
        mgr.subscribe("u1", "chat_1");
        mgr.subscribe("u1", "chat_2");
        mgr.subscribe("u2", "chat_1");

        mgr.disconnect("u1", &tx1);

        assert_eq!(mgr.subscribers_of("chat_1").len(), 1);
        assert!(mgr.subscribers_of("chat_2").is_empty());
    }

    #[test]
    fn multi_device_user_keeps_session_until_last_disconnect() {
        let mgr = ConnectionManager::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        mgr.connect("u1", tx1.clone());
        mgr.connect("u1", tx2.clone());
        mgr.subscribe("u1", "chat_1");

        mgr.disconnect("u1", &tx1);
        assert_eq!(mgr.connection_count("u1"), 1);
        assert_eq!(mgr.subscribers_of("chat_1").len(), 1);

        mgr.disconnect("u1", &tx2);
        assert_eq!(mgr.connection_count("u1"), 0);
        assert!(mgr.subscribers_of("chat_1").is_empty());
    }
}
