//! Error types for the player server.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A URL option does not parse
    #[error("Invalid {name} '{value}': {reason}")]
    InvalidUrl {
        /// Option name
        name: &'static str,
        /// The rejected value
        value: String,
        /// Parser message
        reason: String,
    },

    /// A numeric option is out of range
    #[error("Invalid {name}: {reason}")]
    InvalidValue {
        /// Option name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Server startup and runtime errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind HTTP server
    #[error("Failed to bind HTTP server to {addr}: {source}")]
    HttpBindFailed {
        /// Address that failed to bind
        addr: std::net::SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Outbound HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Metrics registry could not be built
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Server shutdown error
    #[error("Server shutdown error: {0}")]
    Shutdown(String),
}
