//! Error types for the server binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during startup and shutdown.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: pulseboard_core::config::ConfigError,
    },

    /// The gateway failed to start.
    #[error("gateway error: {source}")]
    Gateway {
        /// The underlying startup error.
        #[from]
        source: pulseboard_gateway::startup::StartupError,
    },

    /// Installing the shutdown signal handler failed.
    #[error("signal handler error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A background task panicked or was cancelled.
    #[error("task failed: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}
