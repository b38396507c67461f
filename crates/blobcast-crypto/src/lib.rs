//! Cryptographic operations for encrypted blob streams
//!
//! Streams are split into blobs that are encrypted independently with a
//! shared stream key and a per-blob IV, then stored under the hash of their
//! ciphertext.
//!
//! # Components
//!
//! - **Encryption**: AES-128-CBC with PKCS#7 padding ([`decrypt_blob`], [`encrypt_blob`])
//! - **Keys**: [`StreamKey`] and [`BlobIv`] parsed from descriptor hex
//! - **Hashing**: SHA-384 content addresses ([`blob_hash`])
//!
//! # Examples
//!
//! ```
//! use blobcast_crypto::{decrypt_blob, encrypt_blob, BlobIv, StreamKey};
//!
//! let key = StreamKey::from_hex("000102030405060708090a0b0c0d0e0f")?;
//! let iv = BlobIv::new([7; 16]);
//!
//! let ciphertext = encrypt_blob(b"frame data", &key, &iv);
//! let plaintext = decrypt_blob(&ciphertext, &key, &iv)?;
//! assert_eq!(plaintext, b"frame data");
//! # Ok::<(), blobcast_crypto::CryptoError>(())
//! ```

#![warn(missing_docs)]

pub mod blob_cipher;
pub mod error;
pub mod hash;
pub mod keys;

pub use blob_cipher::{BLOCK_SIZE, decrypt_blob, encrypt_blob, padded_len};
pub use error::CryptoError;
pub use hash::{blob_hash, is_valid_blob_hash, verify_blob_hash};
pub use keys::{BlobIv, IV_SIZE, KEY_SIZE, StreamKey};
