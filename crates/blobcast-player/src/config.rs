//! Server configuration management.
//!
//! Configuration can be provided via:
//! - CLI arguments (`--http-bind`, `--reflector-url`, etc.)
//! - Environment variables (`BLOBCAST_HTTP_BIND`, etc.)
//! - Default values
//!
//! # Example
//!
//! ```no_run
//! use blobcast_player::ServerConfig;
//!
//! let config = ServerConfig::from_args();
//! config.validate().expect("Invalid configuration");
//!
//! println!("Serving on {} from {}", config.http_bind, config.reflector_url);
//! ```

use blobcast_formats::MAX_BLOB_SIZE;
use blobcast_protocol::{
    ClientConfig, DEFAULT_LBRYNET_URL, DEFAULT_REFLECTOR_URL, RetryPolicy, StreamOptions,
};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default size of each body chunk read from a stream
pub const DEFAULT_READ_BUFFER_SIZE: usize = 32 * 1024;

/// Blob ciphertext sizes must be whole AES blocks.
const CIPHER_BLOCK_SIZE: u64 = 16;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Server configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "blobcast-player",
    about = "Streams encrypted blob content over HTTP with byte-range support",
    version
)]
pub struct ServerConfig {
    /// HTTP bind address
    #[arg(long, env = "BLOBCAST_HTTP_BIND", default_value = "0.0.0.0:8080")]
    pub http_bind: SocketAddr,

    /// lbrynet JSON-RPC endpoint used to resolve claims
    #[arg(long, env = "BLOBCAST_LBRYNET_URL", default_value = DEFAULT_LBRYNET_URL)]
    pub lbrynet_url: String,

    /// Blob mirror base URL; blob hashes are appended to it
    #[arg(long, env = "BLOBCAST_REFLECTOR_URL", default_value = DEFAULT_REFLECTOR_URL)]
    pub reflector_url: String,

    /// Timeout in seconds for each resolver or blob request
    #[arg(long, env = "BLOBCAST_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,

    /// Connection timeout in seconds
    #[arg(long, env = "BLOBCAST_CONNECT_TIMEOUT", default_value_t = 10)]
    pub connect_timeout: u64,

    /// Retries for failed resolver calls
    #[arg(long, env = "BLOBCAST_RESOLVE_MAX_RETRIES", default_value_t = 2)]
    pub resolve_retries: u32,

    /// Ciphertext size of a full blob
    #[arg(long, env = "BLOBCAST_MAX_BLOB_SIZE", default_value_t = MAX_BLOB_SIZE)]
    pub max_blob_size: u64,

    /// Bytes read from the stream per response chunk
    #[arg(long, env = "BLOBCAST_READ_BUFFER_SIZE", default_value_t = DEFAULT_READ_BUFFER_SIZE)]
    pub read_buffer_size: usize,

    /// Keep the last decrypted blob of each stream for consecutive reads
    #[arg(long, env = "BLOBCAST_MEMOIZE_LAST_BLOB")]
    pub memoize_last_blob: bool,

    /// Verify blob hashes before decrypting
    #[arg(long, env = "BLOBCAST_VERIFY_BLOB_HASHES")]
    pub verify_blob_hashes: bool,

    /// Log output format
    #[arg(long, env = "BLOBCAST_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            lbrynet_url: DEFAULT_LBRYNET_URL.to_string(),
            reflector_url: DEFAULT_REFLECTOR_URL.to_string(),
            request_timeout: 30,
            connect_timeout: 10,
            resolve_retries: 2,
            max_blob_size: MAX_BLOB_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            memoize_last_blob: false,
            verify_blob_hashes: false,
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - a URL does not parse
    /// - the blob size is not a positive multiple of the cipher block size
    /// - the read buffer or request timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("lbrynet URL", &self.lbrynet_url),
            ("reflector URL", &self.reflector_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
                name,
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }

        if self.max_blob_size < CIPHER_BLOCK_SIZE || self.max_blob_size % CIPHER_BLOCK_SIZE != 0 {
            return Err(ConfigError::InvalidValue {
                name: "max blob size",
                reason: format!(
                    "{} is not a positive multiple of {CIPHER_BLOCK_SIZE}",
                    self.max_blob_size
                ),
            });
        }

        if self.read_buffer_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "read buffer size",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                name: "request timeout",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Client settings for the resolver and blob mirror.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            reflector_url: self.reflector_url.clone(),
            lbrynet_url: self.lbrynet_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            request_timeout: Duration::from_secs(self.request_timeout),
            retry_policy: RetryPolicy {
                max_attempts: self.resolve_retries,
                ..RetryPolicy::default()
            },
            max_blob_size: self.max_blob_size,
            memoize_last_blob: self.memoize_last_blob,
            verify_blob_hashes: self.verify_blob_hashes,
        }
    }

    /// Reader options applied to every stream.
    #[must_use]
    pub fn stream_options(&self) -> StreamOptions {
        self.client_config().stream_options()
    }
}
