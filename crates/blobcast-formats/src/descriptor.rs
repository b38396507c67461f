//! Stream descriptor (sd blob) parsing
//!
//! The stream descriptor is a JSON document stored as an ordinary blob under
//! the claim's source hash. It carries the stream key and one entry per
//! content blob, closed by a zero-length terminator entry that has no hash.
//!
//! ```json
//! {
//!   "stream_name": "6d79766964656f2e6d7034",
//!   "blobs": [
//!     { "blob_hash": "…", "blob_num": 0, "iv": "…", "length": 2097152 },
//!     { "blob_num": 1, "iv": "…", "length": 0 }
//!   ],
//!   "stream_type": "lbryfile",
//!   "key": "…",
//!   "suggested_file_name": "6d79766964656f2e6d7034",
//!   "stream_hash": "…"
//! }
//! ```

use blobcast_crypto::{BlobIv, CryptoError, StreamKey, is_valid_blob_hash};
use serde::{Deserialize, Serialize};

use crate::size::estimate_stream_size;

/// Stream type written by publishers
pub const STREAM_TYPE_LBRYFILE: &str = "lbryfile";

/// Errors produced while parsing a stream descriptor
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// The document is not valid descriptor JSON
    #[error("invalid descriptor JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The stream key is malformed
    #[error("invalid stream key: {0}")]
    InvalidKey(#[source] CryptoError),

    /// A blob IV is malformed
    #[error("invalid IV for blob {blob_num}: {source}")]
    InvalidIv {
        /// Blob sequence number
        blob_num: u32,
        /// Underlying parse failure
        #[source]
        source: CryptoError,
    },

    /// A blob hash is not 96 hex characters
    #[error("invalid hash for blob {blob_num}: {hash:?}")]
    InvalidBlobHash {
        /// Blob sequence number
        blob_num: u32,
        /// Offending value
        hash: String,
    },

    /// A blob with content has no hash to fetch it by
    #[error("blob {blob_num} has length {length} but no hash")]
    MissingBlobHash {
        /// Blob sequence number
        blob_num: u32,
        /// Declared ciphertext length
        length: u64,
    },
}

/// One entry of the descriptor's blob list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    /// Position of this blob in the stream
    pub blob_num: u32,
    /// Content address, absent for the terminator
    pub hash: Option<String>,
    /// Declared ciphertext length
    pub length: u64,
    /// CBC initialization vector
    pub iv: BlobIv,
}

impl BlobInfo {
    /// Create a content blob entry
    pub fn new(blob_num: u32, hash: impl Into<String>, length: u64, iv: BlobIv) -> Self {
        Self {
            blob_num,
            hash: Some(hash.into()),
            length,
            iv,
        }
    }

    /// Create the zero-length entry that closes a stream
    pub const fn terminator(blob_num: u32, iv: BlobIv) -> Self {
        Self {
            blob_num,
            hash: None,
            length: 0,
            iv,
        }
    }

    /// Whether this entry is the stream terminator
    pub const fn is_terminator(&self) -> bool {
        self.hash.is_none()
    }
}

/// Parsed stream descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    stream_name: String,
    stream_type: String,
    key: StreamKey,
    suggested_file_name: String,
    stream_hash: String,
    blobs: Vec<BlobInfo>,
}

#[derive(Serialize, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    stream_name: String,
    blobs: Vec<RawBlobInfo>,
    #[serde(default)]
    stream_type: String,
    key: String,
    #[serde(default)]
    suggested_file_name: String,
    #[serde(default)]
    stream_hash: String,
}

#[derive(Serialize, Deserialize)]
struct RawBlobInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    blob_hash: Option<String>,
    blob_num: u32,
    iv: String,
    length: u64,
}

impl StreamDescriptor {
    /// Build a descriptor from its parts
    ///
    /// `stream_name` and `suggested_file_name` are plain text here; they are
    /// hex-encoded when the descriptor is serialized. Blobs are sorted by
    /// sequence number.
    pub fn new(
        stream_name: impl Into<String>,
        key: StreamKey,
        mut blobs: Vec<BlobInfo>,
    ) -> Self {
        let stream_name = stream_name.into();
        blobs.sort_by_key(|b| b.blob_num);
        Self {
            suggested_file_name: stream_name.clone(),
            stream_name,
            stream_type: STREAM_TYPE_LBRYFILE.to_string(),
            key,
            stream_hash: String::new(),
            blobs,
        }
    }

    /// Parse a descriptor from the raw sd blob bytes
    ///
    /// The blob list is returned ordered by `blob_num` regardless of the order
    /// in the document.
    pub fn parse(data: &[u8]) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor = serde_json::from_slice(data)?;

        let key = StreamKey::from_hex(&raw.key).map_err(DescriptorError::InvalidKey)?;

        let mut blobs = raw
            .blobs
            .into_iter()
            .map(BlobInfo::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        blobs.sort_by_key(|b| b.blob_num);

        Ok(Self {
            stream_name: decode_hex_text(&raw.stream_name),
            stream_type: raw.stream_type,
            key,
            suggested_file_name: decode_hex_text(&raw.suggested_file_name),
            stream_hash: raw.stream_hash,
            blobs,
        })
    }

    /// Serialize to the sd blob JSON format
    pub fn build(&self) -> Result<Vec<u8>, DescriptorError> {
        let raw = RawDescriptor {
            stream_name: hex::encode(&self.stream_name),
            blobs: self
                .blobs
                .iter()
                .map(|b| RawBlobInfo {
                    blob_hash: b.hash.clone(),
                    blob_num: b.blob_num,
                    iv: b.iv.to_hex(),
                    length: b.length,
                })
                .collect(),
            stream_type: self.stream_type.clone(),
            key: self.key.to_hex(),
            suggested_file_name: hex::encode(&self.suggested_file_name),
            stream_hash: self.stream_hash.clone(),
        };
        Ok(serde_json::to_vec(&raw)?)
    }

    /// Set the suggested file name
    #[must_use]
    pub fn with_suggested_file_name(mut self, name: impl Into<String>) -> Self {
        self.suggested_file_name = name.into();
        self
    }

    /// Decoded stream name
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Decoded suggested file name
    pub fn suggested_file_name(&self) -> &str {
        &self.suggested_file_name
    }

    /// Stream type, normally [`STREAM_TYPE_LBRYFILE`]
    pub fn stream_type(&self) -> &str {
        &self.stream_type
    }

    /// Publisher-computed stream hash, passed through unverified
    pub fn stream_hash(&self) -> &str {
        &self.stream_hash
    }

    /// Shared decryption key
    pub const fn key(&self) -> &StreamKey {
        &self.key
    }

    /// Blob entries ordered by sequence number
    pub fn blobs(&self) -> &[BlobInfo] {
        &self.blobs
    }

    /// Blob entry at `index` in sequence order
    pub fn blob(&self, index: usize) -> Option<&BlobInfo> {
        self.blobs.get(index)
    }

    /// Number of entries, terminator included
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    /// Sum of declared ciphertext lengths
    pub fn total_ciphertext_len(&self) -> u64 {
        self.blobs
            .iter()
            .map(|b| b.length)
            .fold(0, u64::saturating_add)
    }

    /// Estimated plaintext length of the whole stream
    pub fn estimated_size(&self, max_blob_size: u64) -> u64 {
        estimate_stream_size(self.blobs.iter().map(|b| b.length), max_blob_size)
    }
}

impl TryFrom<RawBlobInfo> for BlobInfo {
    type Error = DescriptorError;

    fn try_from(raw: RawBlobInfo) -> Result<Self, Self::Error> {
        let iv = BlobIv::from_hex(&raw.iv).map_err(|source| DescriptorError::InvalidIv {
            blob_num: raw.blob_num,
            source,
        })?;

        let hash = raw.blob_hash.filter(|h| !h.is_empty());
        match &hash {
            Some(h) if !is_valid_blob_hash(h) => {
                return Err(DescriptorError::InvalidBlobHash {
                    blob_num: raw.blob_num,
                    hash: h.clone(),
                });
            }
            None if raw.length > 0 => {
                return Err(DescriptorError::MissingBlobHash {
                    blob_num: raw.blob_num,
                    length: raw.length,
                });
            }
            _ => {}
        }

        Ok(Self {
            blob_num: raw.blob_num,
            hash: hash.map(|h| h.to_ascii_lowercase()),
            length: raw.length,
            iv,
        })
    }
}

// Names are hex-encoded UTF-8; anything that doesn't decode is kept verbatim.
fn decode_hex_text(value: &str) -> String {
    hex::decode(value)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| value.to_string())
}
