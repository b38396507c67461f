//! Server state management and orchestration.
//!
//! Holds the collaborators every play request shares: the claim resolver,
//! the blob source and the metrics registry. Stream handles themselves are
//! never shared; each request opens its own.

use crate::config::ServerConfig;
use crate::error::ServerError;
use blobcast_protocol::{
    BlobSource, HttpClient, LbrynetResolver, ReflectorClient, Resolver, StreamHandle,
    StreamMetrics, StreamOptions,
};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    resolver: Arc<dyn Resolver>,
    blobs: Arc<dyn BlobSource>,
    options: StreamOptions,
    read_buffer_size: usize,
    metrics: Arc<StreamMetrics>,

    /// Server start time (for uptime)
    started_at: SystemTime,
}

impl AppState {
    /// Create application state talking to lbrynet and the blob mirror.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the HTTP client, mirror URL or metrics
    /// registry cannot be built.
    pub fn new(config: &ServerConfig) -> Result<Self, ServerError> {
        let client_config = config.client_config();
        let http = HttpClient::with_config(&client_config.http_config())?;

        tracing::info!("Resolving claims through {}", client_config.lbrynet_url);
        tracing::info!("Fetching blobs from {}", client_config.reflector_url);

        let resolver = LbrynetResolver::new(
            client_config.lbrynet_url.clone(),
            http.clone(),
            client_config.retry_policy.clone(),
        );
        let blobs = ReflectorClient::new(&client_config.reflector_url, http).map_err(|e| {
            crate::error::ConfigError::InvalidUrl {
                name: "reflector URL",
                value: client_config.reflector_url.clone(),
                reason: e.to_string(),
            }
        })?;

        Self::with_collaborators(
            Arc::new(resolver),
            Arc::new(blobs),
            client_config.stream_options(),
            config.read_buffer_size,
        )
    }

    /// Create application state from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the metrics registry cannot be built.
    pub fn with_collaborators(
        resolver: Arc<dyn Resolver>,
        blobs: Arc<dyn BlobSource>,
        options: StreamOptions,
        read_buffer_size: usize,
    ) -> Result<Self, ServerError> {
        let metrics = Arc::new(StreamMetrics::new()?);
        Ok(Self {
            resolver,
            blobs,
            options: options.with_metrics(Arc::clone(&metrics)),
            read_buffer_size,
            metrics,
            started_at: SystemTime::now(),
        })
    }

    /// Resolve `uri` and open a fresh stream handle for one request.
    ///
    /// # Errors
    ///
    /// Returns the stream setup error unchanged so handlers can map it to
    /// a status code.
    pub async fn open_stream(&self, uri: &str) -> blobcast_protocol::Result<StreamHandle> {
        StreamHandle::open(
            uri,
            self.resolver.as_ref(),
            Arc::clone(&self.blobs),
            self.options.clone(),
        )
        .await
    }

    /// Bytes read from a stream per response chunk.
    #[must_use]
    pub const fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// Metrics shared by every stream this server opens.
    #[must_use]
    pub const fn metrics(&self) -> &Arc<StreamMetrics> {
        &self.metrics
    }

    /// Get server uptime in seconds.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.started_at)
            .unwrap_or_default()
            .as_secs()
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("options", &self.options)
            .field("read_buffer_size", &self.read_buffer_size)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// Server orchestration.
pub struct Server {
    /// Shared application state
    state: Arc<AppState>,
    /// Server configuration
    config: ServerConfig,
}

impl Server {
    /// Create new server with configuration.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the outbound clients cannot be built.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let state = AppState::new(&config)?;

        tracing::info!(
            max_blob_size = config.max_blob_size,
            memoize_last_blob = config.memoize_last_blob,
            verify_blob_hashes = config.verify_blob_hashes,
            "Server initialized"
        );

        Ok(Self {
            state: Arc::new(state),
            config,
        })
    }

    /// Shared state used by the HTTP handlers.
    #[must_use]
    pub const fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Run the server until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the server stops with an
    /// error.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
            tracing::info!("Received shutdown signal");
        })
        .await
    }

    /// Run the server until `shutdown` completes, then drain connections.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the server stops with an
    /// error.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Starting blobcast player");
        tracing::info!("HTTP server binding to: {}", self.config.http_bind);

        let listener = crate::http::bind(self.config.http_bind).await?;
        crate::http::start_server(listener, self.state, shutdown).await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_default_config() {
        let state = AppState::new(&ServerConfig::default()).unwrap();
        assert_eq!(state.read_buffer_size(), 32 * 1024);
        assert!(state.uptime_seconds() < 5);
        assert!(state.options.metrics.is_some());
    }

    #[test]
    fn test_state_rejects_bad_reflector_url() {
        let config = ServerConfig {
            reflector_url: "::nope".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            AppState::new(&config),
            Err(ServerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_run_until_stops_on_signal() {
        let config = ServerConfig {
            http_bind: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        };
        let server = Server::new(config).unwrap();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            server.run_until(async {}),
        )
        .await
        .unwrap();
        assert!(result.is_ok());
    }
}
