//! Stream size estimation from blob lengths
//!
//! The descriptor only records ciphertext lengths. A full-size blob always
//! holds exactly one byte less plaintext than its ciphertext, but the
//! padding of a shorter blob (normally the last one) cannot be known
//! without decrypting it, so a fixed correction is subtracted instead.

/// Default maximum ciphertext size of a single blob (2 MiB)
pub const MAX_BLOB_SIZE: u64 = 2 * 1024 * 1024;

/// Bytes subtracted from the summed blob lengths for the final blob's padding
pub const LAST_BLOB_PADDING_CORRECTION: u64 = 15;

/// Plaintext bytes carried by a blob whose ciphertext is `max_blob_size` long
pub const fn full_blob_plaintext_len(max_blob_size: u64) -> u64 {
    max_blob_size.saturating_sub(1)
}

/// Estimate the decrypted length of a stream from its blob ciphertext lengths
///
/// Blobs of exactly `max_blob_size` contribute `max_blob_size - 1` bytes,
/// every other blob contributes its declared length, and
/// [`LAST_BLOB_PADDING_CORRECTION`] is subtracted from the total. The result
/// is advisory: it can differ from the true plaintext length by a byte.
/// Streams shorter than the correction estimate to zero.
pub fn estimate_stream_size<I>(lengths: I, max_blob_size: u64) -> u64
where
    I: IntoIterator<Item = u64>,
{
    let total = lengths
        .into_iter()
        .map(|length| {
            if length == max_blob_size {
                full_blob_plaintext_len(max_blob_size)
            } else {
                length
            }
        })
        .fold(0u64, u64::saturating_add);

    total.saturating_sub(LAST_BLOB_PADDING_CORRECTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_full_blobs() {
        let lengths = [MAX_BLOB_SIZE; 3];
        assert_eq!(
            estimate_stream_size(lengths, MAX_BLOB_SIZE),
            3 * (MAX_BLOB_SIZE - 1) - 15
        );
    }

    #[test]
    fn test_partial_last_blob_and_terminator() {
        let lengths = [MAX_BLOB_SIZE, 1024, 0];
        assert_eq!(
            estimate_stream_size(lengths, MAX_BLOB_SIZE),
            MAX_BLOB_SIZE - 1 + 1024 - 15
        );
    }

    #[test]
    fn test_tiny_stream_saturates() {
        assert_eq!(estimate_stream_size([16], MAX_BLOB_SIZE), 1);
        assert_eq!(estimate_stream_size([0], MAX_BLOB_SIZE), 0);
        assert_eq!(estimate_stream_size(Vec::new(), MAX_BLOB_SIZE), 0);
    }

    proptest! {
        #[test]
        fn prop_n_full_blobs(n in 1u64..64, max in 32u64..(8 * 1024 * 1024)) {
            let lengths = vec![max; n as usize];
            prop_assert_eq!(estimate_stream_size(lengths, max), n * (max - 1) - 15);
        }
    }
}
