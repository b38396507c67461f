//! Claim resolution and seekable playback of encrypted blob streams
//!
//! A play request flows through three collaborators:
//!
//! 1. a [`Resolver`] turns the claim URI into the descriptor hash, media
//!    type, declared size and fee,
//! 2. a [`BlobSource`] serves the stream descriptor and content blobs by
//!    hash,
//! 3. a [`StreamHandle`] maps plaintext positions to blobs, decrypting one
//!    blob per read.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use blobcast_protocol::{
//!     ClientConfig, HttpClient, LbrynetResolver, ReflectorClient, StreamHandle,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env();
//! let http = HttpClient::with_config(&config.http_config())?;
//! let resolver = LbrynetResolver::new(&config.lbrynet_url, http.clone(), config.retry_policy.clone());
//! let blobs = Arc::new(ReflectorClient::new(&config.reflector_url, http)?);
//!
//! let mut stream = StreamHandle::open("lbry://what", &resolver, blobs, config.stream_options()).await?;
//! let mut buf = vec![0u8; 32 * 1024];
//! let n = stream.read(&mut buf).await?;
//! println!("{} of {} bytes", n, stream.size());
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod config;
pub mod error;
pub mod metrics;
pub mod reflector;
pub mod resolver;
pub mod retry;
pub mod stream;
pub mod transport;

#[cfg(test)]
mod testing;

pub use blob::BlobDecryptor;
pub use config::{ClientConfig, DEFAULT_LBRYNET_URL, DEFAULT_REFLECTOR_URL};
pub use error::{FetchError, ResolveError, Result, StreamError};
pub use metrics::StreamMetrics;
pub use reflector::{BlobSource, ReflectorClient};
pub use resolver::{Fee, LbrynetResolver, Resolver, StreamMetadata};
pub use retry::RetryPolicy;
pub use stream::{ResolvedStream, StreamHandle, StreamOptions, StreamRequest, Whence};
pub use transport::{HttpClient, HttpConfig, ensure_crypto_provider};
