//! `WebSocket` handler: one participant per socket.
//!
//! Clients connect to `GET /ws`. The socket task:
//!
//! 1. subscribes to presence broadcasts, so the client also sees its own
//!    join notification;
//! 2. registers the connection with the presence loop;
//! 3. forwards decoded text frames as events and every broadcast as a
//!    JSON text frame;
//! 4. reports the disconnect when the socket closes or errors, or sends a
//!    close frame when the presence loop has stopped.
//!
//! Frames that do not decode into a [`ClientEvent`] are dropped here and
//! never reach the loop. If a client falls behind the broadcast channel,
//! lagged messages are skipped and the client resumes with the newest
//! snapshot.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use pulseboard_core::runner::Command;
use pulseboard_types::{ClientEvent, ConnectionId};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a presence `WebSocket`.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_presence(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Why a socket task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// The client went away.
    ClientClosed,
    /// The presence loop stopped; nothing left to relay.
    LoopStopped,
}

/// Run one connection from accept to close.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let id = ConnectionId::new();
    let mut rx = state.subscribe();

    if state.presence.send(Command::connect(id)).await.is_err() {
        warn!(connection = %id, "Presence loop stopped, refusing connection");
        return;
    }
    debug!(connection = %id, "WebSocket client connected");

    let exit = loop {
        tokio::select! {
            // Relay a broadcast to this client.
            result = rx.recv() => match result {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            warn!(event = event.name(), "Failed to serialize broadcast: {e}");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        debug!(connection = %id, "WebSocket send failed");
                        break Exit::ClientClosed;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    debug!(connection = %id, skipped = n, "WebSocket client lagged, skipping ahead");
                }
                Err(RecvError::Closed) => break Exit::LoopStopped,
            },
            // Read the next frame from the client.
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let Some(event) = decode_event(id, text.as_str()) else {
                        continue;
                    };
                    if state.presence.send(Command::event(id, event)).await.is_err() {
                        break Exit::LoopStopped;
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        break Exit::ClientClosed;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break Exit::ClientClosed,
                Some(Err(e)) => {
                    debug!(connection = %id, "WebSocket error: {e}");
                    break Exit::ClientClosed;
                }
                Some(Ok(Message::Binary(_) | Message::Pong(_))) => {}
            },
        }
    };

    debug!(connection = %id, ?exit, "WebSocket closed");
    match exit {
        Exit::ClientClosed => {
            // The loop may already be gone during shutdown; nothing to undo then.
            let _ = state.presence.send(Command::disconnect(id)).await;
        }
        Exit::LoopStopped => {
            let _ = socket.send(Message::Close(None)).await;
        }
    }
}

/// Decode one inbound text frame. Malformed frames are logged and dropped.
fn decode_event(id: ConnectionId, text: &str) -> Option<ClientEvent> {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(connection = %id, error = %e, "Dropping malformed client frame");
            None
        }
    }
}
