//! Gateway startup helper for embedding in the engine binary.
//!
//! [`spawn_gateway`] binds the port eagerly, so a taken port fails
//! startup instead of a background task, and then serves on a background
//! Tokio task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pulseboard_gateway::{spawn_gateway, AppState, ServerConfig};
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(presence_handle));
//! let gateway = spawn_gateway(&ServerConfig::default(), state, shutdown).await?;
//! tracing::info!(addr = %gateway.addr, "serving");
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the gateway.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A running gateway.
#[derive(Debug)]
pub struct GatewayHandle {
    /// The bound address (useful when the configured port was `0`).
    pub addr: SocketAddr,
    /// The serving task. Completes after graceful shutdown.
    pub task: JoinHandle<()>,
}

/// Bind the gateway and serve it on a background task.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is invalid or the port
/// cannot be bound.
pub async fn spawn_gateway<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<GatewayHandle, StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = crate::server::bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let task = tokio::spawn(async move {
        if let Err(e) = crate::server::serve(listener, state, shutdown).await {
            tracing::error!(error = %e, "Gateway exited with error");
        }
    });

    tracing::info!(%addr, "Gateway spawned on background task");

    Ok(GatewayHandle { addr, task })
}
