//! Stream descriptor format for encrypted blob streams
//!
//! A stream is published as a sequence of encrypted blobs plus one
//! descriptor blob listing them. This crate parses and builds that
//! descriptor and estimates the decrypted stream length from it.
//!
//! # Examples
//!
//! ```
//! use blobcast_formats::{MAX_BLOB_SIZE, StreamDescriptor};
//!
//! let json = br#"{
//!     "stream_name": "68656c6c6f",
//!     "blobs": [{"blob_num": 0, "iv": "00000000000000000000000000000000", "length": 0}],
//!     "stream_type": "lbryfile",
//!     "key": "000102030405060708090a0b0c0d0e0f",
//!     "suggested_file_name": "68656c6c6f",
//!     "stream_hash": ""
//! }"#;
//!
//! let sd = StreamDescriptor::parse(json)?;
//! assert_eq!(sd.stream_name(), "hello");
//! assert_eq!(sd.estimated_size(MAX_BLOB_SIZE), 0);
//! # Ok::<(), blobcast_formats::DescriptorError>(())
//! ```

#![warn(missing_docs)]

pub mod descriptor;
pub mod size;

pub use descriptor::{BlobInfo, DescriptorError, STREAM_TYPE_LBRYFILE, StreamDescriptor};
pub use size::{
    LAST_BLOB_PADDING_CORRECTION, MAX_BLOB_SIZE, estimate_stream_size, full_blob_plaintext_len,
};
