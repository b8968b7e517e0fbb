//! Open pages (clients) and which generation controls each.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Identifier of an open page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Shared registry of open clients.
///
/// Cloning yields another handle to the same registry. The value for each
/// client is the cache name of the generation controlling it, if any.
#[derive(Debug, Clone, Default)]
pub struct Clients {
    inner: Arc<RwLock<HashMap<ClientId, Option<String>>>>,
    next_id: Arc<AtomicU64>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened page, optionally already controlled.
    pub async fn open(&self, controller: Option<&str>) -> ClientId {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner.write().await.insert(id, controller.map(String::from));
        id
    }

    pub async fn controller_of(&self, id: ClientId) -> Option<String> {
        self.inner.read().await.get(&id).cloned().flatten()
    }

    /// Make `controller` the controller of every open client.
    ///
    /// Returns the number of clients claimed.
    pub async fn claim(&self, controller: &str) -> usize {
        let mut clients = self.inner.write().await;
        for slot in clients.values_mut() {
            *slot = Some(controller.to_string());
        }
        clients.len()
    }

    /// Drop control of every client held by `controller`.
    pub async fn release(&self, controller: &str) {
        let mut clients = self.inner.write().await;
        for slot in clients.values_mut() {
            if slot.as_deref() == Some(controller) {
                *slot = None;
            }
        }
    }

    /// Number of clients currently under any controller.
    pub async fn controlled_count(&self) -> usize {
        self.inner.read().await.values().filter(|c| c.is_some()).count()
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }
}
