//! HTTP request handlers.

use crate::http::range::serve_content;
use crate::server::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use blobcast_protocol::StreamError;
use serde::Deserialize;
use std::sync::Arc;

/// Handle GET / endpoint.
pub async fn handle_index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("blobcast player, up {}s\n", state.uptime_seconds()),
    )
}

/// Handle GET /content/claims/{name}/{claim_id}/{filename}.
///
/// The file name only makes the URL friendlier for players that derive a
/// title from it; the claim is identified by name and claim id.
///
/// # Errors
///
/// Returns `AppError` if the stream cannot be resolved or opened.
pub async fn handle_play_claim(
    Path((name, claim_id, filename)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let uri = format!("{name}#{claim_id}");
    tracing::debug!(%uri, %filename, "play request");
    play(&state, &uri, &headers).await
}

/// Query for GET /content/url
#[derive(Debug, Deserialize)]
pub struct PlayQuery {
    /// Claim URI to play, e.g. `lbry://name#claimid`
    #[serde(default)]
    pub url: String,
}

/// Handle GET /content/url?url=... endpoint.
///
/// # Errors
///
/// Returns `AppError` if the stream cannot be resolved or opened.
pub async fn handle_play_url(
    Query(query): Query<PlayQuery>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    tracing::debug!(uri = %query.url, "play request");
    play(&state, &query.url, &headers).await
}

/// Handle GET /metrics endpoint in Prometheus text format.
pub async fn handle_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics().gather(),
    )
}

async fn play(state: &AppState, uri: &str, headers: &HeaderMap) -> Result<Response, AppError> {
    let handle = state.open_stream(uri).await?;

    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    Ok(serve_content(
        handle,
        range,
        state.read_buffer_size(),
        Some(Arc::clone(state.metrics())),
    )?)
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Stream could not be opened or positioned
    Stream(StreamError),
}

impl AppError {
    /// Status code sent for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Stream(err) => match err {
                StreamError::Validation(_) => StatusCode::BAD_REQUEST,
                StreamError::PaidContent { .. } => StatusCode::PAYMENT_REQUIRED,
                StreamError::Resolution(e) if e.is_not_found() => StatusCode::NOT_FOUND,
                StreamError::IndexFetch { source, .. } if source.is_not_found() => {
                    StatusCode::NOT_FOUND
                }
                StreamError::Resolution(_)
                | StreamError::IndexFetch { .. }
                | StreamError::IndexParse(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let Self::Stream(err) = self;

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "stream setup failed: {err}");
        } else {
            tracing::debug!(status = status.as_u16(), "stream rejected: {err}");
        }

        (status, err.to_string()).into_response()
    }
}

impl From<StreamError> for AppError {
    fn from(err: StreamError) -> Self {
        Self::Stream(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use blobcast_protocol::{
        BlobSource, FetchError, ResolveError, Resolver, StreamMetadata, StreamOptions,
    };
    use bytes::Bytes;
    use reqwest::StatusCode as ReqwestStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Resolver that never finds anything and counts calls
    #[derive(Default)]
    struct NoClaims {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Resolver for NoClaims {
        async fn resolve(&self, uri: &str) -> Result<StreamMetadata, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ResolveError::NotFound {
                uri: uri.to_string(),
                reason: "could not find claim".to_string(),
            })
        }
    }

    struct NoBlobs;

    #[async_trait]
    impl BlobSource for NoBlobs {
        async fn fetch(&self, _hash: &str) -> Result<Bytes, FetchError> {
            Err(FetchError::Status(ReqwestStatus::NOT_FOUND))
        }
    }

    fn create_test_state(resolver: Arc<NoClaims>) -> Arc<AppState> {
        Arc::new(
            AppState::with_collaborators(
                resolver,
                Arc::new(NoBlobs),
                StreamOptions::default(),
                1024,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_empty_url_is_bad_request() {
        let resolver = Arc::new(NoClaims::default());
        let state = create_test_state(Arc::clone(&resolver));

        let err = handle_play_url(
            Query(PlayQuery { url: String::new() }),
            State(state),
            HeaderMap::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resolver.calls.load(Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn test_unknown_claim_is_not_found() {
        let resolver = Arc::new(NoClaims::default());
        let state = create_test_state(Arc::clone(&resolver));

        let err = handle_play_claim(
            Path((
                "what".to_string(),
                "6769855a9aa43b67086f9ff3c1a5bacb5698a27a".to_string(),
                "what.mp4".to_string(),
            )),
            State(state),
            HeaderMap::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resolver.calls.load(Ordering::SeqCst),
            1
        );
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                StreamError::PaidContent {
                    uri: "lbry://paid".to_string(),
                    amount: 1.5,
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                StreamError::Resolution(ResolveError::Rpc {
                    code: -32500,
                    message: "daemon not ready".to_string(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                StreamError::IndexFetch {
                    sd_hash: "ab".repeat(48),
                    source: FetchError::Status(ReqwestStatus::NOT_FOUND),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                StreamError::IndexFetch {
                    sd_hash: "ab".repeat(48),
                    source: FetchError::Status(ReqwestStatus::SERVICE_UNAVAILABLE),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (StreamError::InvalidWhence(7), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let state = create_test_state(Arc::new(NoClaims::default()));
        let response = handle_metrics(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
