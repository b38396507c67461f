//! HTTP gateway for encrypted blob streams.
//!
//! Resolves a claim, loads its stream descriptor and serves the decrypted
//! content with byte-range support, so browsers and media players can seek
//! without downloading the whole stream first.
//!
//! # Architecture
//!
//! - `server`: shared state and orchestration
//! - `config`: CLI/environment configuration and validation
//! - `http`: router, handlers and the range adapter
//!
//! # Example
//!
//! ```no_run
//! use blobcast_player::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     tracing_subscriber::fmt::init();
//!
//!     let config = ServerConfig::from_args();
//!     config.validate()?;
//!
//!     let server = Server::new(config)?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod http;
pub mod server;

pub use config::{LogFormat, ServerConfig};
pub use error::{ConfigError, ServerError};
pub use server::{AppState, Server};
