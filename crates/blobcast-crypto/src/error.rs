//! Error types for cryptographic operations

use thiserror::Error;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key size
    #[error("Invalid key size: expected {expected}, got {actual}")]
    InvalidKeySize {
        /// Expected key size in bytes
        expected: usize,
        /// Actual key size in bytes
        actual: usize,
    },

    /// Invalid IV size
    #[error("Invalid IV size: expected {expected}, got {actual}")]
    InvalidIvSize {
        /// Expected IV size in bytes
        expected: usize,
        /// Actual IV size in bytes
        actual: usize,
    },

    /// Invalid key or IV encoding
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Ciphertext is not a whole number of cipher blocks
    #[error("Invalid ciphertext length {length}: not a multiple of {block_size}")]
    InvalidCiphertextLength {
        /// Length of the rejected ciphertext
        length: usize,
        /// Cipher block size in bytes
        block_size: usize,
    },

    /// Padding check failed after decryption (wrong key/IV or corrupted data)
    #[error("Invalid padding after decryption")]
    InvalidPadding,
}
