//! Gateway HTTP server lifecycle management.
//!
//! [`bind`] claims the TCP port, [`serve`] runs the Axum server on an
//! already-bound listener until the shutdown future resolves.
//! [`start_server`] does both.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Configuration for the gateway server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on. `0` picks an ephemeral port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 5000,
        }
    }
}

impl From<&pulseboard_core::config::ListenConfig> for ServerConfig {
    fn from(listen: &pulseboard_core::config::ListenConfig) -> Self {
        Self {
            host: listen.host.clone(),
            port: listen.port,
        }
    }
}

/// Bind a TCP listener for the configured address.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is invalid or the port
/// cannot be bound.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve requests on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the server hits a fatal I/O error.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(state);

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Gateway listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))
}

/// Bind and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = bind(config).await?;
    serve(listener, state, shutdown).await
}

/// Errors that can occur when starting or running the gateway server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_host_is_a_bind_error() {
        let config = ServerConfig {
            host: String::from("not an address"),
            port: 0,
        };
        assert!(matches!(bind(&config).await, Err(ServerError::Bind(_))));
    }

    #[tokio::test]
    async fn ephemeral_port_binds() {
        let config = ServerConfig {
            host: String::from("127.0.0.1"),
            port: 0,
        };
        let listener = bind(&config).await;
        assert!(listener.is_ok_and(|l| l.local_addr().is_ok_and(|a| a.port() != 0)));
    }

    #[test]
    fn converts_from_listen_config() {
        let listen = pulseboard_core::config::ListenConfig {
            host: String::from("127.0.0.1"),
            port: 6000,
        };
        let config = ServerConfig::from(&listen);
        assert_eq!(config.port, 6000);
        assert_eq!(config.host, "127.0.0.1");
    }
}
