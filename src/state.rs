use std::sync::Arc;

use crate::store::Store;
use crate::ws::ConnectionManager;

/// Shared application state passed to all handlers via the axum State
/// extractor. Constructed once at process start; every connection task and
/// REST handler sees the same manager and store.
#[derive(Clone)]
pub struct AppState {
    /// In-memory keyed store for users, chats, and message histories
    pub store: Arc<Store>,
    /// Connection registry + chat subscription index + dispatcher
    pub manager: Arc<ConnectionManager>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(store),
            manager: Arc::new(ConnectionManager::new()),
        }
    }
}
