//! Shared application state for the API server.
//!
//! [`AppState`] holds the store handles the handlers query, the
//! discovery settings, the token verifier, and the broadcast channel that
//! carries stale-view notices to `WebSocket` subscribers. It is also the
//! [`ViewInvalidator`] handed to the attendance ledger.

use std::sync::Arc;

use gather_core::config::DiscoverySection;
use gather_core::{AttendanceStore, EventCatalog, ProfileStore, ViewInvalidator};
use tokio::sync::broadcast;
use tracing::debug;

use crate::auth::JwtVerifier;

/// Capacity of the broadcast channel for invalidation notices.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// JSON-serializable stale-view notice pushed over the `WebSocket`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Invalidation {
    /// Path of the view that must be re-rendered, e.g. `/events/<id>`.
    pub path: String,
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for invalidation notices.
    pub tx: broadcast::Sender<Invalidation>,
    /// Membership rows and attendee counters.
    pub attendance: Arc<dyn AttendanceStore>,
    /// Event listing queries.
    pub catalog: Arc<dyn EventCatalog>,
    /// User profiles.
    pub profiles: Arc<dyn ProfileStore>,
    /// Page size, featured limit and trending percentile.
    pub discovery: DiscoverySection,
    /// Bearer token verifier; `None` treats every caller as anonymous.
    pub auth: Option<JwtVerifier>,
}

impl AppState {
    /// Create state over a single store implementing every store trait.
    pub fn new<S>(store: Arc<S>, discovery: DiscoverySection) -> Self
    where
        S: AttendanceStore + EventCatalog + ProfileStore + 'static,
    {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            attendance: Arc::clone(&store) as Arc<dyn AttendanceStore>,
            catalog: Arc::clone(&store) as Arc<dyn EventCatalog>,
            profiles: store,
            discovery,
            auth: None,
        }
    }

    /// Attach a bearer token verifier.
    #[must_use]
    pub fn with_auth(mut self, verifier: Option<JwtVerifier>) -> Self {
        self.auth = verifier;
        self
    }

    /// Subscribe to the invalidation channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.tx.subscribe()
    }

    /// Publish a notice to all connected clients.
    ///
    /// Returns the number of receivers that received the message.
    /// Returns 0 if no clients are connected (this is not an error).
    pub fn broadcast(&self, notice: &Invalidation) -> usize {
        // send returns Err only when there are zero receivers,
        // which is normal when no WebSocket clients are connected.
        self.tx.send(notice.clone()).unwrap_or(0)
    }
}

impl ViewInvalidator for AppState {
    fn invalidate(&self, path: &str) {
        let receivers = self.broadcast(&Invalidation {
            path: path.to_owned(),
        });
        debug!(path, receivers, "Published stale view");
    }
}

#[cfg(test)]
mod tests {
    use gather_core::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn invalidate_reaches_subscribers() {
        let state = AppState::new(Arc::new(MemoryStore::new()), DiscoverySection::default());
        let mut rx = state.subscribe();

        state.invalidate("/events/42");

        let notice = rx.recv().await.map(|n| n.path).unwrap_or_default();
        assert_eq!(notice, "/events/42");
    }

    #[test]
    fn broadcast_without_subscribers_is_not_an_error() {
        let state = AppState::new(Arc::new(MemoryStore::new()), DiscoverySection::default());
        assert_eq!(state.broadcast(&Invalidation { path: String::from("/") }), 0);
    }
}
