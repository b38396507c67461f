//! Blob content addresses
//!
//! A blob is addressed by the SHA-384 of its ciphertext, written as 96
//! lowercase hex characters.

use sha2::{Digest, Sha384};

/// Length of a hex-encoded blob hash
pub const BLOB_HASH_HEX_LEN: usize = 96;

/// Compute the content address of a ciphertext blob
pub fn blob_hash(ciphertext: &[u8]) -> String {
    hex::encode(Sha384::digest(ciphertext))
}

/// Check whether `hash` is the content address of `ciphertext`
pub fn verify_blob_hash(ciphertext: &[u8], hash: &str) -> bool {
    blob_hash(ciphertext).eq_ignore_ascii_case(hash)
}

/// Check that a string looks like a blob hash
pub fn is_valid_blob_hash(hash: &str) -> bool {
    hash.len() == BLOB_HASH_HEX_LEN && hash.bytes().all(|b| b.is_ascii_hexdigit())
}
