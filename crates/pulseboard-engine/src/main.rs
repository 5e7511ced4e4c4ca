//! PulseBoard server binary.
//!
//! Wires the presence loop and the HTTP/WebSocket gateway together and
//! runs them until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `pulseboard-config.yaml` (optional) and
//!    the `PORT` environment variable
//! 3. Create the presence loop and spawn it
//! 4. Bind and spawn the gateway
//! 5. Wait for `Ctrl-C`, then shut both down and log the result

mod error;

use std::path::Path;
use std::sync::Arc;

use pulseboard_core::clock::SystemClock;
use pulseboard_core::config::PulseConfig;
use pulseboard_core::runner::PresenceLoop;
use pulseboard_gateway::{AppState, ServerConfig};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file looked up in the working directory.
const CONFIG_FILE: &str = "pulseboard-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the port cannot be
/// bound, or a background task fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("pulseboard starting");

    // 2. Load configuration.
    let config = load_config(Path::new(CONFIG_FILE))?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        tick_interval_ms = config.presence.tick_interval_ms,
        idle_after_ms = config.presence.idle_after_ms,
        reject_stale_sequence = config.presence.reject_stale_sequence,
        "Configuration loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // 3. Presence loop.
    let (presence, handle) = PresenceLoop::new(config.presence.clone(), SystemClock);
    let presence_task = tokio::spawn(presence.run(wait_for_shutdown(shutdown_rx.clone())));

    // 4. Gateway.
    let state = Arc::new(AppState::new(handle));
    let gateway = pulseboard_gateway::spawn_gateway(
        &ServerConfig::from(&config.server),
        state,
        wait_for_shutdown(shutdown_rx),
    )
    .await
    .map_err(EngineError::from)?;
    info!(addr = %gateway.addr, "🚀 Server running on http://{}", gateway.addr);

    // 5. Run until interrupted.
    tokio::signal::ctrl_c().await.map_err(EngineError::from)?;
    info!("Shutdown requested");
    // Both receivers may already be gone if a task died; that is fine.
    let _ = shutdown_tx.send(true);

    gateway.task.await.map_err(|e| EngineError::Task {
        message: format!("gateway task: {e}"),
    })?;
    let result = presence_task.await.map_err(|e| EngineError::Task {
        message: format!("presence task: {e}"),
    })?;

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        commands_handled = result.commands_handled,
        "pulseboard shutdown complete"
    );

    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. Environment overrides apply either way.
fn load_config(path: &Path) -> Result<PulseConfig, EngineError> {
    if path.exists() {
        Ok(PulseConfig::from_file(path)?)
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(PulseConfig::parse("")?)
    }
}

/// Resolve once the shutdown flag flips to `true` (or its sender drops).
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    // An Err means the sender is gone, which is also a reason to stop.
    let _ = rx.wait_for(|stop| *stop).await;
}
