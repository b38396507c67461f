//! Content-addressed blob storage
//!
//! Blobs, the stream descriptor included, are fetched with a plain GET of
//! `<base URL><hex hash>`.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Instant;
use url::Url;

use crate::error::FetchError;
use crate::transport::HttpClient;

/// Source of raw (still encrypted) blobs by hash
#[async_trait]
pub trait BlobSource: Send + Sync {
    /// Fetch the blob stored under the hex `hash`
    ///
    /// Any non-2xx response is an error; nothing is retried.
    async fn fetch(&self, hash: &str) -> Result<Bytes, FetchError>;
}

/// HTTP blob mirror client
#[derive(Debug, Clone)]
pub struct ReflectorClient {
    http: HttpClient,
    base_url: Url,
}

impl ReflectorClient {
    /// Create a client for the mirror at `base_url`
    pub fn new(base_url: &str, http: HttpClient) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    /// Base URL, always ending in `/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL a blob is served from
    pub fn blob_url(&self, hash: &str) -> String {
        format!("{}{hash}", self.base_url)
    }
}

#[async_trait]
impl BlobSource for ReflectorClient {
    async fn fetch(&self, hash: &str) -> Result<Bytes, FetchError> {
        let url = self.blob_url(hash);
        tracing::debug!(url = %url, "requesting a blob");
        let start = Instant::now();

        let response = self.http.inner().get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, %status, "blob request rejected");
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        tracing::debug!(
            url = %url,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "done downloading a blob"
        );
        Ok(body)
    }
}
