//! Axum router construction for the gateway.
//!
//! Assembles the readiness route and the presence `WebSocket` into one
//! [`Router`] with CORS open to every origin, since browser clients are
//! served from a different host.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- readiness string
/// - `GET /ws` -- presence `WebSocket`
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws", get(ws::ws_presence))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
