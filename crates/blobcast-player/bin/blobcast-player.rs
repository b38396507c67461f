//! blobcast player binary entry point.
//!
//! Parses configuration, initializes logging and runs the server until
//! Ctrl+C.

use anyhow::Result;
use blobcast_player::{LogFormat, Server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_args();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    tracing::info!(
        "Configuration loaded: HTTP={}, lbrynet={}, reflector={}",
        config.http_bind,
        config.lbrynet_url,
        config.reflector_url
    );

    config.validate()?;

    let server = Server::new(config)?;
    server.run().await?;

    Ok(())
}
