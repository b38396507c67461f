//! Turning claim URIs into stream metadata

mod lbrynet;

pub use lbrynet::LbrynetResolver;

use async_trait::async_trait;

use crate::error::ResolveError;

/// Media type used when a claim does not declare one
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Price attached to a claim
#[derive(Debug, Clone, PartialEq)]
pub struct Fee {
    /// Amount in `currency` units
    pub amount: f64,
    pub currency: Option<String>,
    pub address: Option<String>,
}

/// What the resolver knows about a stream claim
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMetadata {
    /// Hash of the stream descriptor blob
    pub source_hash: Vec<u8>,
    /// Declared media type, may be empty
    pub media_type: String,
    /// Declared plaintext size, 0 when unknown
    pub size: u64,
    pub fee: Option<Fee>,
}

impl StreamMetadata {
    /// Descriptor hash as lowercase hex
    pub fn sd_hash(&self) -> String {
        hex::encode(&self.source_hash)
    }

    /// Fee amount, 0 for free claims
    pub fn fee_amount(&self) -> f64 {
        self.fee.as_ref().map_or(0.0, |fee| fee.amount)
    }

    /// Declared media type or the generic binary type
    pub fn content_type(&self) -> &str {
        if self.media_type.is_empty() {
            DEFAULT_MEDIA_TYPE
        } else {
            &self.media_type
        }
    }
}

/// Resolves a claim URI to stream metadata
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, uri: &str) -> Result<StreamMetadata, ResolveError>;
}
