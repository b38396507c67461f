//! Stream keys and per-blob initialization vectors
//!
//! Every blob of a stream is encrypted with the same 16-byte stream key and
//! its own 16-byte IV. Both travel hex-encoded inside the stream descriptor.

use std::fmt;

use crate::error::CryptoError;

/// AES-128 key size in bytes
pub const KEY_SIZE: usize = 16;

/// CBC initialization vector size in bytes
pub const IV_SIZE: usize = 16;

/// Shared symmetric key for every blob of one stream
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StreamKey([u8; KEY_SIZE]);

impl StreamKey {
    /// Create a key from raw bytes
    pub const fn new(key: [u8; KEY_SIZE]) -> Self {
        Self(key)
    }

    /// Parse key from hex string
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex.trim())
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid hex: {e}")))?;

        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeySize {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    /// Raw key bytes
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

// Keys never end up in logs verbatim.
impl fmt::Debug for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamKey(..)")
    }
}

/// Per-blob CBC initialization vector
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobIv([u8; IV_SIZE]);

impl BlobIv {
    /// Create an IV from raw bytes
    pub const fn new(iv: [u8; IV_SIZE]) -> Self {
        Self(iv)
    }

    /// Parse IV from hex string
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex.trim())
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid hex: {e}")))?;

        if bytes.len() != IV_SIZE {
            return Err(CryptoError::InvalidIvSize {
                expected: IV_SIZE,
                actual: bytes.len(),
            });
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&bytes);
        Ok(Self(iv))
    }

    /// Raw IV bytes
    pub const fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for BlobIv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobIv({})", self.to_hex())
    }
}

impl fmt::Display for BlobIv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
