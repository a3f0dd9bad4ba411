//! Shared application state.

use eventlog_store::EventStore;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The event store every route delegates to.
    pub event_store: EventStore,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(event_store: EventStore) -> Self {
        Self { event_store }
    }
}
