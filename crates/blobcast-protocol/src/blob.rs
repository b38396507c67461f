//! Fetch-and-decrypt of single blobs

use std::sync::Arc;
use std::time::Instant;

use blobcast_crypto::{StreamKey, decrypt_blob, verify_blob_hash};
use blobcast_formats::BlobInfo;
use bytes::Bytes;

use crate::error::{Result, StreamError};
use crate::metrics::StreamMetrics;
use crate::reflector::BlobSource;

/// Turns descriptor entries into plaintext using one stream's key
pub struct BlobDecryptor {
    source: Arc<dyn BlobSource>,
    key: StreamKey,
    verify_hashes: bool,
    metrics: Option<Arc<StreamMetrics>>,
}

impl BlobDecryptor {
    pub fn new(source: Arc<dyn BlobSource>, key: StreamKey) -> Self {
        Self {
            source,
            key,
            verify_hashes: false,
            metrics: None,
        }
    }

    /// Check ciphertext hashes before decrypting
    #[must_use]
    pub fn verify_hashes(mut self, verify: bool) -> Self {
        self.verify_hashes = verify;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Option<Arc<StreamMetrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Download and decrypt one blob
    ///
    /// The terminator entry decrypts to nothing without touching storage.
    pub async fn fetch(&self, blob: &BlobInfo) -> Result<Bytes> {
        let Some(hash) = blob.hash.as_deref() else {
            return Ok(Bytes::new());
        };

        let start = Instant::now();
        let result = self.fetch_inner(blob, hash).await;

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(plaintext) => metrics.record_blob(start.elapsed(), plaintext.len()),
                Err(_) => metrics.record_blob_failed(),
            }
        }
        result
    }

    async fn fetch_inner(&self, blob: &BlobInfo, hash: &str) -> Result<Bytes> {
        let ciphertext = self
            .source
            .fetch(hash)
            .await
            .map_err(|source| StreamError::BlobFetch {
                blob_num: blob.blob_num,
                hash: hash.to_string(),
                source,
            })?;

        if self.verify_hashes && !verify_blob_hash(&ciphertext, hash) {
            return Err(StreamError::BlobHashMismatch {
                blob_num: blob.blob_num,
                expected: hash.to_string(),
            });
        }

        let plaintext = decrypt_blob(&ciphertext, &self.key, &blob.iv).map_err(|source| {
            StreamError::Decryption {
                blob_num: blob.blob_num,
                source,
            }
        })?;

        tracing::debug!(
            blob_num = blob.blob_num,
            ciphertext_len = ciphertext.len(),
            plaintext_len = plaintext.len(),
            "decrypted blob"
        );
        Ok(Bytes::from(plaintext))
    }
}
