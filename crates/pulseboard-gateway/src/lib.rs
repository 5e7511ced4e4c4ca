//! HTTP and WebSocket gateway for PulseBoard.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **Readiness page** (`GET /`) returning a static string
//! - **Presence `WebSocket`** (`GET /ws`): one participant per socket.
//!   Inbound JSON frames become commands for the presence loop; every
//!   broadcast from the loop is forwarded to the socket.
//!
//! # Architecture
//!
//! The gateway never touches participant state. Each socket task holds a
//! [`PresenceHandle`] to send commands and a broadcast receiver for
//! outbound events, so all mutation stays on the single presence loop.
//!
//! [`PresenceHandle`]: pulseboard_core::runner::PresenceHandle

pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{GatewayHandle, spawn_gateway};
pub use state::AppState;
