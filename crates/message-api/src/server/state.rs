//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::db::MessageStore;

/// Application state shared across all request handlers.
///
/// Cloned by Axum for every request; the store is behind an [`Arc`] so the
/// clone is a reference-count bump.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for [`Message`](crate::db::Message) records.
    pub store: Arc<dyn MessageStore>,
}

impl AppState {
    /// Create a new [`AppState`] around `store`.
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }
}
