//! Configuration for resolver and blob storage clients

use blobcast_formats::MAX_BLOB_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::stream::StreamOptions;
use crate::transport::HttpConfig;

/// Public blob mirror used when nothing else is configured
pub const DEFAULT_REFLECTOR_URL: &str = "http://blobs.lbry.io/";

/// Local lbrynet daemon API
pub const DEFAULT_LBRYNET_URL: &str = "http://localhost:5279/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL that blob hashes are appended to
    pub reflector_url: String,

    /// lbrynet JSON-RPC endpoint
    pub lbrynet_url: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Request timeout, applied to every resolver and storage call
    pub request_timeout: Duration,

    /// Retry policy for resolver calls
    pub retry_policy: RetryPolicy,

    /// Ciphertext size of a full blob
    pub max_blob_size: u64,

    /// Keep the last decrypted blob per stream
    pub memoize_last_blob: bool,

    /// Check fetched ciphertext against its hash before decrypting
    pub verify_blob_hashes: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reflector_url: DEFAULT_REFLECTOR_URL.to_string(),
            lbrynet_url: DEFAULT_LBRYNET_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
            max_blob_size: MAX_BLOB_SIZE,
            memoize_last_blob: false,
            verify_blob_hashes: false,
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            reflector_url: lookup("BLOBCAST_REFLECTOR_URL").unwrap_or(defaults.reflector_url),
            lbrynet_url: lookup("BLOBCAST_LBRYNET_URL").unwrap_or(defaults.lbrynet_url),
            connect_timeout: lookup("BLOBCAST_CONNECT_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.connect_timeout, Duration::from_secs),
            request_timeout: lookup("BLOBCAST_REQUEST_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.request_timeout, Duration::from_secs),
            retry_policy: RetryPolicy::from_lookup(&lookup),
            max_blob_size: lookup("BLOBCAST_MAX_BLOB_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_blob_size),
            memoize_last_blob: lookup("BLOBCAST_MEMOIZE_LAST_BLOB")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.memoize_last_blob),
            verify_blob_hashes: lookup("BLOBCAST_VERIFY_BLOB_HASHES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.verify_blob_hashes),
        }
    }

    /// Transport settings derived from the timeouts
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::default().with_timeouts(self.connect_timeout, self.request_timeout)
    }

    /// Per-stream reader options
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            max_blob_size: self.max_blob_size,
            memoize_last_blob: self.memoize_last_blob,
            verify_blob_hashes: self.verify_blob_hashes,
            ..StreamOptions::default()
        }
    }
}
