//! Stream lifecycle: request, resolution, descriptor load, reading
//!
//! Each step consumes the previous one, so a [`StreamHandle`] always has a
//! resolved claim and a loaded descriptor behind it:
//!
//! ```text
//! StreamRequest::new(uri) -> resolve() -> ResolvedStream -> fetch_index() -> StreamHandle
//! ```

mod reader;

pub use reader::{Whence, blob_position};

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use blobcast_formats::{MAX_BLOB_SIZE, StreamDescriptor};
use bytes::Bytes;

use crate::blob::BlobDecryptor;
use crate::error::{Result, StreamError};
use crate::metrics::StreamMetrics;
use crate::reflector::BlobSource;
use crate::resolver::Resolver;

/// Per-stream reader settings
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Ciphertext size of a full blob
    pub max_blob_size: u64,
    /// Keep the most recently decrypted blob for consecutive reads
    pub memoize_last_blob: bool,
    /// Check ciphertext hashes before decrypting
    pub verify_blob_hashes: bool,
    pub metrics: Option<Arc<StreamMetrics>>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            max_blob_size: MAX_BLOB_SIZE,
            memoize_last_blob: false,
            verify_blob_hashes: false,
            metrics: None,
        }
    }
}

impl StreamOptions {
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<StreamMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// A validated play request that has not been resolved yet
#[derive(Debug, Clone)]
pub struct StreamRequest {
    uri: String,
    requested_at: Instant,
}

impl StreamRequest {
    /// Validate `uri`; an empty URI never reaches the network
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(StreamError::Validation("stream uri is not set".to_string()));
        }
        Ok(Self {
            uri,
            requested_at: Instant::now(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Look the claim up and reject paid content
    pub async fn resolve(self, resolver: &dyn Resolver) -> Result<ResolvedStream> {
        let metadata = resolver.resolve(&self.uri).await?;

        let amount = metadata.fee_amount();
        if amount > 0.0 {
            return Err(StreamError::PaidContent {
                uri: self.uri,
                amount,
            });
        }

        let resolved = ResolvedStream {
            sd_hash: metadata.sd_hash(),
            content_type: metadata.content_type().to_string(),
            size: metadata.size,
            uri: self.uri,
            requested_at: self.requested_at,
        };

        tracing::debug!(
            uri = %resolved.uri,
            sd_hash = %resolved.sd_hash,
            content_type = %resolved.content_type,
            size = resolved.size,
            "got stream data"
        );
        Ok(resolved)
    }
}

/// A free stream claim whose descriptor has not been fetched yet
#[derive(Debug, Clone)]
pub struct ResolvedStream {
    uri: String,
    sd_hash: String,
    content_type: String,
    size: u64,
    requested_at: Instant,
}

impl ResolvedStream {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Stream descriptor hash (hex)
    pub fn sd_hash(&self) -> &str {
        &self.sd_hash
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Size declared by the claim, 0 when unknown
    pub const fn declared_size(&self) -> u64 {
        self.size
    }

    /// Download and parse the stream descriptor
    ///
    /// When the claim declared no size it is estimated from the blob list.
    pub async fn fetch_index(
        self,
        source: Arc<dyn BlobSource>,
        options: StreamOptions,
    ) -> Result<StreamHandle> {
        let data = source
            .fetch(&self.sd_hash)
            .await
            .map_err(|source| StreamError::IndexFetch {
                sd_hash: self.sd_hash.clone(),
                source,
            })?;

        let descriptor = StreamDescriptor::parse(&data)?;

        let size = if self.size == 0 {
            descriptor.estimated_size(options.max_blob_size)
        } else {
            self.size
        };

        tracing::debug!(
            uri = %self.uri,
            sd_hash = %self.sd_hash,
            blob_count = descriptor.blob_count(),
            size,
            estimated = self.size == 0,
            "loaded stream descriptor"
        );

        let decryptor = BlobDecryptor::new(source, *descriptor.key())
            .verify_hashes(options.verify_blob_hashes)
            .with_metrics(options.metrics.clone());

        Ok(StreamHandle {
            uri: self.uri,
            sd_hash: self.sd_hash,
            content_type: self.content_type,
            size,
            descriptor,
            decryptor,
            options,
            cursor: 0,
            memo: None,
            requested_at: self.requested_at,
            first_blob_served: false,
        })
    }
}

/// An open, seekable, decrypting view of one stream
///
/// Owned by a single request. Reads fetch at most one blob each and nothing
/// is shared with other handles.
pub struct StreamHandle {
    uri: String,
    sd_hash: String,
    content_type: String,
    size: u64,
    descriptor: StreamDescriptor,
    decryptor: BlobDecryptor,
    options: StreamOptions,
    cursor: u64,
    memo: Option<(u64, Bytes)>,
    requested_at: Instant,
    first_blob_served: bool,
}

impl StreamHandle {
    /// Validate, resolve and load the descriptor in one go
    pub async fn open(
        uri: impl Into<String>,
        resolver: &dyn Resolver,
        source: Arc<dyn BlobSource>,
        options: StreamOptions,
    ) -> Result<Self> {
        let metrics = options.metrics.clone();

        let result = async {
            StreamRequest::new(uri)?
                .resolve(resolver)
                .await?
                .fetch_index(source, options)
                .await
        }
        .await;

        if let Some(metrics) = metrics {
            match &result {
                Ok(_) => metrics.record_stream_opened(),
                Err(_) => metrics.record_stream_failed(),
            }
        }
        result
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn sd_hash(&self) -> &str {
        &self.sd_hash
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Declared or estimated plaintext size
    pub const fn size(&self) -> u64 {
        self.size
    }

    pub const fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    /// Current read position
    pub const fn position(&self) -> u64 {
        self.cursor
    }

    pub const fn options(&self) -> &StreamOptions {
        &self.options
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("uri", &self.uri)
            .field("sd_hash", &self.sd_hash)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .field("blob_count", &self.descriptor.blob_count())
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}
