//! Error types for stream playback

use blobcast_crypto::CryptoError;
use blobcast_formats::DescriptorError;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure retrieving a blob from storage
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server responded with an unexpected status ({0})")]
    Status(StatusCode),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,
}

impl FetchError {
    /// HTTP status reported by storage, if any
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }

    /// Whether storage reported the blob as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e)
        }
    }
}

/// Failure turning a URI into stream metadata
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not resolve {uri}: {reason}")]
    NotFound { uri: String, reason: String },

    #[error("{uri} is a {value_type} claim, not a stream")]
    NotAStream { uri: String, value_type: String },

    #[error("resolver RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed resolver response: {0}")]
    Malformed(String),

    #[error("resolver transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("resolver responded with an unexpected status ({0})")]
    Status(StatusCode),
}

impl ResolveError {
    /// Check if error is transient
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status(status) => {
                matches!(
                    *status,
                    StatusCode::TOO_MANY_REQUESTS
                        | StatusCode::INTERNAL_SERVER_ERROR
                        | StatusCode::BAD_GATEWAY
                        | StatusCode::SERVICE_UNAVAILABLE
                        | StatusCode::GATEWAY_TIMEOUT
                )
            }
            _ => false,
        }
    }

    /// Whether the URI simply does not name a playable stream
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NotAStream { .. })
    }
}

/// Errors raised while opening or reading a stream
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid stream request: {0}")]
    Validation(String),

    #[error("paid stream: {uri} has a fee of {amount}")]
    PaidContent { uri: String, amount: f64 },

    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolveError),

    #[error("failed to fetch stream descriptor {sd_hash}: {source}")]
    IndexFetch {
        sd_hash: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to parse stream descriptor: {0}")]
    IndexParse(#[from] DescriptorError),

    #[error("failed to fetch blob {blob_num} ({hash}): {source}")]
    BlobFetch {
        blob_num: u32,
        hash: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to decrypt blob {blob_num}: {source}")]
    Decryption {
        blob_num: u32,
        #[source]
        source: CryptoError,
    },

    #[error("blob {blob_num} content does not match hash {expected}")]
    BlobHashMismatch { blob_num: u32, expected: String },

    #[error("blob {blob_num} is beyond the end of the stream ({blob_count} blobs)")]
    IndexOutOfRange { blob_num: u64, blob_count: usize },

    #[error("invalid seek whence argument: {0}")]
    InvalidWhence(i32),

    #[error("seeking before the beginning of file: {0}")]
    NegativeSeek(i128),

    #[error("seek position {0} is out of range")]
    SeekOverflow(i128),

    #[error("position {cursor} maps before the start of blob {blob_num}")]
    MisalignedOffset { cursor: u64, blob_num: u64 },
}

impl StreamError {
    /// Whether the error happened before any stream data could be produced
    pub const fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::PaidContent { .. }
                | Self::Resolution(_)
                | Self::IndexFetch { .. }
                | Self::IndexParse(_)
        )
    }
}

impl From<StreamError> for std::io::Error {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::InvalidWhence(_)
            | StreamError::NegativeSeek(_)
            | StreamError::SeekOverflow(_) => Self::new(std::io::ErrorKind::InvalidInput, e),
            StreamError::BlobFetch {
                source: FetchError::Timeout,
                ..
            } => Self::new(std::io::ErrorKind::TimedOut, e),
            other => Self::other(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_status_message() {
        let err = FetchError::Status(StatusCode::NOT_FOUND);
        assert!(err.is_not_found());
        assert!(
            err.to_string()
                .contains("server responded with an unexpected status")
        );
        assert!(!FetchError::Timeout.is_not_found());
    }

    #[test]
    fn test_resolve_retry_classification() {
        assert!(ResolveError::Status(StatusCode::BAD_GATEWAY).should_retry());
        assert!(!ResolveError::Status(StatusCode::BAD_REQUEST).should_retry());
        assert!(
            !ResolveError::NotFound {
                uri: "lbry://x".to_string(),
                reason: "gone".to_string()
            }
            .should_retry()
        );
        assert!(!ResolveError::Malformed("x".to_string()).should_retry());
    }

    #[test]
    fn test_setup_errors() {
        assert!(StreamError::Validation("empty".to_string()).is_setup_error());
        assert!(
            StreamError::PaidContent {
                uri: "lbry://x".to_string(),
                amount: 0.01
            }
            .is_setup_error()
        );
        assert!(!StreamError::InvalidWhence(7).is_setup_error());
        assert!(
            !StreamError::IndexOutOfRange {
                blob_num: 3,
                blob_count: 2
            }
            .is_setup_error()
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io: std::io::Error = StreamError::NegativeSeek(-1).into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidInput);

        let io: std::io::Error = StreamError::BlobFetch {
            blob_num: 0,
            hash: "ab".to_string(),
            source: FetchError::Timeout,
        }
        .into();
        assert_eq!(io.kind(), std::io::ErrorKind::TimedOut);
    }
}
