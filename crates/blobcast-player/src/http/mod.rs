//! HTTP server implementation using axum.

use crate::error::ServerError;
use crate::server::AppState;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod range;

/// Create HTTP router with all endpoints.
///
/// Responses are never compressed: compressed bodies cannot honour byte
/// ranges.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", axum::routing::get(handlers::handle_index))
        .route(
            "/content/claims/{name}/{claim_id}/{filename}",
            axum::routing::get(handlers::handle_play_claim),
        )
        .route(
            "/content/url",
            axum::routing::get(handlers::handle_play_url),
        )
        .route("/metrics", axum::routing::get(handlers::handle_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the HTTP listener.
///
/// # Errors
///
/// Returns `ServerError::HttpBindFailed` if the address cannot be bound.
pub async fn bind(bind_addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(bind_addr)
        .await
        .map_err(|source| ServerError::HttpBindFailed {
            addr: bind_addr,
            source,
        })
}

/// Serve requests on `listener` until `shutdown` completes.
///
/// In-flight responses are allowed to finish after the signal.
///
/// # Errors
///
/// Returns `ServerError` if the server encounters a runtime error.
pub async fn start_server<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    match listener.local_addr() {
        Ok(addr) => tracing::info!("HTTP server listening on {}", addr),
        Err(e) => tracing::warn!("HTTP server listening on unknown address: {e}"),
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Shutdown(format!("HTTP server error: {e}")))?;

    Ok(())
}
