//! Client registry implementation
//!
//! The one piece of mutable state shared between connection handlers and the
//! broadcast pipeline.

use std::collections::HashMap;

use tokio::sync::{RwLock, RwLockWriteGuard};

use super::listener::{self, ListenerId, ListenerSink, ListenerStream};

/// Registry of every connected listener
///
/// Thread-safe via `RwLock`. Register, unregister and the broadcast's
/// iterate-and-prune step each take the write lock, so a listener is never
/// skipped or written twice while the map changes underneath.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    /// Map of listener id to its sink
    listeners: RwLock<HashMap<ListenerId, ListenerSink>>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener
    ///
    /// Returns the listener's id and the stream the transport should send
    /// to the client. The listener receives chunks written from now on only.
    pub async fn register(&self) -> (ListenerId, ListenerStream) {
        let (sink, stream) = listener::channel();
        let mut listeners = self.listeners.write().await;

        let mut id = ListenerId::new();
        while listeners.contains_key(&id) {
            id = ListenerId::new();
        }
        listeners.insert(id, sink);

        tracing::info!(
            listener = %id,
            listeners = listeners.len(),
            "Listener registered"
        );

        (id, stream)
    }

    /// Unregister a listener
    ///
    /// Unregistering an id that is not present is a no-op.
    pub async fn unregister(&self, id: &ListenerId) -> bool {
        let mut listeners = self.listeners.write().await;
        let removed = listeners.remove(id).is_some();

        if removed {
            tracing::info!(
                listener = %id,
                listeners = listeners.len(),
                "Listener unregistered"
            );
        }

        removed
    }

    /// Unregister every listener, ending their streams
    ///
    /// Returns the number of listeners removed.
    pub async fn clear(&self) -> usize {
        let mut listeners = self.listeners.write().await;
        let count = listeners.len();
        listeners.clear();

        if count > 0 {
            tracing::info!(listeners = count, "All listeners unregistered");
        }

        count
    }

    /// Check if a listener is registered
    pub async fn contains(&self, id: &ListenerId) -> bool {
        self.listeners.read().await.contains_key(id)
    }

    /// Get the number of registered listeners
    pub async fn len(&self) -> usize {
        self.listeners.read().await.len()
    }

    /// Check if no listeners are registered
    pub async fn is_empty(&self) -> bool {
        self.listeners.read().await.is_empty()
    }

    /// Ids of every registered listener, in no particular order
    pub async fn ids(&self) -> Vec<ListenerId> {
        self.listeners.read().await.keys().copied().collect()
    }

    /// Exclusive access for one broadcast pass
    pub(crate) async fn lock(&self) -> RwLockWriteGuard<'_, HashMap<ListenerId, ListenerSink>> {
        self.listeners.write().await
    }
}
