//! HTTP transport shared by the resolver and blob storage clients

use reqwest::{Client, ClientBuilder};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

static CRYPTO_PROVIDER: OnceLock<()> = OnceLock::new();

/// Install the ring provider as the process-wide rustls default
///
/// reqwest is built without a bundled provider, so one must be installed
/// before the first TLS connection. Safe to call repeatedly.
pub fn ensure_crypto_provider() {
    CRYPTO_PROVIDER.get_or_init(|| {
        // Err means another provider is already installed, which is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// HTTP client with connection pooling and per-request timeouts
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(&HttpConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        ensure_crypto_provider();

        let client = ClientBuilder::new()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(config.tcp_nodelay)
            .tcp_keepalive(config.tcp_keepalive)
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Whole-request timeout, body included
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Enable `TCP_NODELAY`
    pub tcp_nodelay: bool,

    /// TCP keep-alive duration
    pub tcp_keepalive: Option<Duration>,

    /// User-Agent header value
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 16,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            tcp_nodelay: true,
            tcp_keepalive: Some(Duration::from_secs(60)),
            user_agent: concat!("blobcast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    /// Override both timeouts
    #[must_use]
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.timeout = request;
        self
    }
}
