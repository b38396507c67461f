//! AES-128-CBC blob cipher
//!
//! Blobs are encrypted independently with AES-128 in CBC mode and PKCS#7
//! padding. Padding is always present, so a blob holding `n` plaintext bytes
//! is `n + 1 ..= n + 16` bytes of ciphertext. A maximum-size blob therefore
//! carries one byte less plaintext than its ciphertext length.

use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::CryptoError;
use crate::keys::{BlobIv, StreamKey};

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

/// Decrypt one blob and strip its padding
pub fn decrypt_blob(
    ciphertext: &[u8],
    key: &StreamKey,
    iv: &BlobIv,
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertextLength {
            length: ciphertext.len(),
            block_size: BLOCK_SIZE,
        });
    }

    Aes128CbcDec::new(key.as_bytes().into(), iv.as_bytes().into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::InvalidPadding)
}

/// Encrypt one blob, appending PKCS#7 padding
pub fn encrypt_blob(plaintext: &[u8], key: &StreamKey, iv: &BlobIv) -> Vec<u8> {
    Aes128CbcEnc::new(key.as_bytes().into(), iv.as_bytes().into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Ciphertext length produced by [`encrypt_blob`] for `plaintext_len` bytes
pub const fn padded_len(plaintext_len: usize) -> usize {
    (plaintext_len / BLOCK_SIZE + 1) * BLOCK_SIZE
}
