//! Integration tests for the play endpoints.
//!
//! These tests start a real HTTP server in front of mock lbrynet and blob
//! mirror servers and make actual requests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use axum::http::StatusCode;
use blobcast_crypto::{BlobIv, StreamKey, blob_hash, encrypt_blob};
use blobcast_formats::{BlobInfo, StreamDescriptor};
use blobcast_player::{AppState, ServerConfig, ServerError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LARGE_BLOB_SIZE: u64 = 16 * 1024 * 1024;
const SMALL_BLOB_SIZE: u64 = 64;

struct TestServer {
    addr: SocketAddr,
    lbrynet: MockServer,
    reflector: MockServer,
    client: reqwest::Client,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn get(&self, path: &str, range: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(range) = range {
            request = request.header(reqwest::header::RANGE, range);
        }
        request.send().await.expect("Failed to send request")
    }

    /// Encrypt `content` into blobs, serve them from the mirror and make
    /// `uri` resolve to the resulting stream.
    async fn publish(&self, uri: &str, content: &[u8], max_blob_size: u64, fee: serde_json::Value) {
        let key = StreamKey::new(*b"fedcba9876543210");
        let chunk_len = usize::try_from(max_blob_size - 1).unwrap();

        let mut blobs = Vec::new();
        for (num, chunk) in content.chunks(chunk_len).enumerate() {
            let iv = BlobIv::new([u8::try_from(num).unwrap(); 16]);
            let ciphertext = encrypt_blob(chunk, &key, &iv);
            let hash = blob_hash(&ciphertext);
            blobs.push(BlobInfo::new(
                u32::try_from(num).unwrap(),
                hash.clone(),
                ciphertext.len() as u64,
                iv,
            ));
            self.serve_blob(&hash, ciphertext).await;
        }
        blobs.push(BlobInfo::terminator(
            u32::try_from(blobs.len()).unwrap(),
            BlobIv::new([0xFF; 16]),
        ));

        let descriptor = StreamDescriptor::new("test.mp4", key, blobs)
            .build()
            .unwrap();
        let sd_hash = blob_hash(&descriptor);
        self.serve_blob(&sd_hash, descriptor).await;

        self.resolve_to(
            uri,
            json!({
                "value_type": "stream",
                "value": {
                    "source": {
                        "sd_hash": sd_hash,
                        "media_type": "video/mp4",
                        "size": content.len().to_string()
                    },
                    "fee": fee
                }
            }),
        )
        .await;
    }

    async fn serve_blob(&self, hash: &str, data: Vec<u8>) {
        Mock::given(method("GET"))
            .and(path(format!("/{hash}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(data))
            .mount(&self.reflector)
            .await;
    }

    async fn resolve_to(&self, uri: &str, claim: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({
                "method": "resolve",
                "params": {"urls": [uri]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {uri: claim}
            })))
            .mount(&self.lbrynet)
            .await;
    }
}

/// Start test HTTP server on random port.
async fn start_test_server(max_blob_size: u64) -> TestServer {
    // Install ring crypto provider for reqwest (idempotent)
    let _ = rustls::crypto::ring::default_provider().install_default();

    let lbrynet = MockServer::start().await;
    let reflector = MockServer::start().await;

    let config = ServerConfig {
        http_bind: "127.0.0.1:0".parse().expect("Failed to parse bind address"),
        lbrynet_url: format!("{}/", lbrynet.uri()),
        reflector_url: format!("{}/", reflector.uri()),
        resolve_retries: 0,
        max_blob_size,
        memoize_last_blob: true,
        verify_blob_hashes: true,
        ..ServerConfig::default()
    };

    let state = Arc::new(AppState::new(&config).expect("Failed to initialize AppState"));
    let listener = blobcast_player::http::bind(config.http_bind)
        .await
        .expect("Failed to bind HTTP listener");
    let addr = listener
        .local_addr()
        .expect("Failed to get listener address");

    let (shutdown, signal) = oneshot::channel::<()>();
    let handle = tokio::spawn(blobcast_player::http::start_server(
        listener,
        state,
        async move {
            let _ = signal.await;
        },
    ));

    TestServer {
        addr,
        lbrynet,
        reflector,
        client: reqwest::Client::new(),
        shutdown,
        handle,
    }
}

fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| u8::try_from(i % 251).unwrap()).collect()
}

fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn test_index() {
    let server = start_test_server(LARGE_BLOB_SIZE).await;

    let response = server.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_preflight() {
    let server = start_test_server(LARGE_BLOB_SIZE).await;

    let response = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/content/url"))
        .header("Origin", "http://player.example")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        header(&response, "access-control-allow-origin"),
        Some("*")
    );
}

#[tokio::test]
async fn test_range_from_middle_of_large_stream() {
    let server = start_test_server(LARGE_BLOB_SIZE).await;
    let data = content(10_000_000);
    server
        .publish("what#6769855a9aa43b67086f9ff3c1a5bacb5698a27a", &data, LARGE_BLOB_SIZE, json!(null))
        .await;

    let response = server
        .get(
            "/content/claims/what/6769855a9aa43b67086f9ff3c1a5bacb5698a27a/what.mp4",
            Some("bytes=5000000-"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header(&response, "content-range"),
        Some("bytes 5000000-9999999/10000000")
    );
    assert_eq!(header(&response, "content-length"), Some("5000000"));
    assert_eq!(header(&response, "accept-ranges"), Some("bytes"));
    assert_eq!(header(&response, "content-type"), Some("video/mp4"));

    let body = response.bytes().await.unwrap();
    assert_eq!(body.len(), 5_000_000);
    assert!(body[..] == data[5_000_000..], "body differs from source");
}

#[tokio::test]
async fn test_full_body_across_blobs() {
    let server = start_test_server(SMALL_BLOB_SIZE).await;
    let data = content(150);
    server
        .publish("lbry://small", &data, SMALL_BLOB_SIZE, json!(null))
        .await;

    let response = server.get("/content/url?url=lbry://small", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-length"), Some("150"));
    assert_eq!(header(&response, "accept-ranges"), Some("bytes"));
    assert_eq!(header(&response, "content-range"), None);
    assert_eq!(response.bytes().await.unwrap().to_vec(), data);
}

#[tokio::test]
async fn test_range_inside_second_blob() {
    let server = start_test_server(SMALL_BLOB_SIZE).await;
    let data = content(150);
    server
        .publish("lbry://small", &data, SMALL_BLOB_SIZE, json!(null))
        .await;

    let response = server
        .get("/content/url?url=lbry://small", Some("bytes=70-"))
        .await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&response, "content-range"), Some("bytes 70-149/150"));
    assert_eq!(response.bytes().await.unwrap().to_vec(), data[70..].to_vec());
}

#[tokio::test]
async fn test_unsatisfiable_range() {
    let server = start_test_server(SMALL_BLOB_SIZE).await;
    server
        .publish("lbry://small", &content(150), SMALL_BLOB_SIZE, json!(null))
        .await;

    let response = server
        .get("/content/url?url=lbry://small", Some("bytes=500-"))
        .await;

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&response, "content-range"), Some("bytes */150"));
}

#[tokio::test]
async fn test_suffix_range_on_empty_stream() {
    let server = start_test_server(SMALL_BLOB_SIZE).await;
    server
        .publish("lbry://empty", &[], SMALL_BLOB_SIZE, json!(null))
        .await;

    for range in [None, Some("bytes=-5"), Some("bytes=0-")] {
        let response = server.get("/content/url?url=lbry://empty", range).await;

        assert_eq!(response.status(), StatusCode::OK, "range {range:?}");
        assert_eq!(header(&response, "content-length"), Some("0"));
        assert_eq!(header(&response, "content-range"), None);
        assert!(response.bytes().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_multiple_ranges_serve_full_body() {
    let server = start_test_server(SMALL_BLOB_SIZE).await;
    let data = content(150);
    server
        .publish("lbry://small", &data, SMALL_BLOB_SIZE, json!(null))
        .await;

    let response = server
        .get("/content/url?url=lbry://small", Some("bytes=0-9,20-29"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().to_vec(), data);
}

#[tokio::test]
async fn test_paid_stream() {
    let server = start_test_server(SMALL_BLOB_SIZE).await;
    server
        .publish(
            "lbry://paid",
            &content(10),
            SMALL_BLOB_SIZE,
            json!({"amount": "1.5", "currency": "LBC"}),
        )
        .await;

    let response = server.get("/content/url?url=lbry://paid", None).await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    // Nothing but the resolve call went out
    assert!(server.reflector.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_url() {
    let server = start_test_server(SMALL_BLOB_SIZE).await;

    for path in ["/content/url?url=", "/content/url"] {
        let response = server.get(path, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert!(server.lbrynet.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_claim() {
    let server = start_test_server(SMALL_BLOB_SIZE).await;
    server
        .resolve_to(
            "nope#abc",
            json!({"error": {"name": "NOT_FOUND", "text": "Could not find claim at \"nope#abc\"."}}),
        )
        .await;

    let response = server
        .get("/content/claims/nope/abc/nope.mp4", None)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.text().await.unwrap();
    assert!(body.contains("Could not find claim"), "unexpected body: {body}");
}

#[tokio::test]
async fn test_metrics_count_streams() {
    let server = start_test_server(SMALL_BLOB_SIZE).await;
    server
        .publish("lbry://small", &content(150), SMALL_BLOB_SIZE, json!(null))
        .await;

    let response = server.get("/content/url?url=lbry://small", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    response.bytes().await.unwrap();

    let metrics = server.get("/metrics", None).await.text().await.unwrap();
    assert!(metrics.contains("blobcast_streams_opened_total 1"));
    assert!(metrics.contains("blobcast_bytes_served_total 150"));
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let server = start_test_server(SMALL_BLOB_SIZE).await;
    assert_eq!(server.get("/", None).await.status(), StatusCode::OK);

    let TestServer {
        addr,
        shutdown,
        handle,
        ..
    } = server;

    shutdown.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());

    let refused = reqwest::Client::new()
        .get(format!("http://{addr}/"))
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(refused.is_err());
}
