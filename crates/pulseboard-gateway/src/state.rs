//! Shared application state for the gateway.
//!
//! [`AppState`] carries the handle to the presence loop. Socket tasks use
//! it to send commands and to subscribe to broadcasts; the HTTP routes
//! only read static data.

use pulseboard_core::runner::PresenceHandle;
use pulseboard_types::ServerEvent;
use tokio::sync::broadcast;

/// Static readiness string served at `GET /`.
pub const READINESS_MESSAGE: &str = "PulseBoard backend is running 🚀";

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the presence loop.
    pub presence: PresenceHandle,
}

impl AppState {
    /// Create application state around a presence loop handle.
    pub const fn new(presence: PresenceHandle) -> Self {
        Self { presence }
    }

    /// Subscribe to presence broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.presence.subscribe()
    }
}
