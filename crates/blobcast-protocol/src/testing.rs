//! In-memory collaborators for unit tests

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use blobcast_crypto::{BlobIv, StreamKey, blob_hash, encrypt_blob};
use blobcast_formats::{BlobInfo, StreamDescriptor};
use bytes::Bytes;
use reqwest::StatusCode;

use crate::error::{FetchError, ResolveError};
use crate::reflector::BlobSource;
use crate::resolver::{Fee, Resolver, StreamMetadata};

pub fn test_key() -> StreamKey {
    StreamKey::new(*b"0123456789abcdef")
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Bytes>>,
    fetches: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn insert(&self, hash: &str, data: Vec<u8>) {
        self.blobs
            .lock()
            .unwrap()
            .insert(hash.to_string(), Bytes::from(data));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobSource for MemoryBlobStore {
    async fn fetch(&self, hash: &str) -> Result<Bytes, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or(FetchError::Status(StatusCode::NOT_FOUND))
    }
}

/// Resolver answering every URI with the same metadata
pub struct StaticResolver {
    metadata: StreamMetadata,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new(sd_hash: &str, size: u64) -> Self {
        Self {
            metadata: StreamMetadata {
                source_hash: hex::decode(sd_hash).unwrap(),
                media_type: "video/mp4".to_string(),
                size,
                fee: None,
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_fee(mut self, amount: f64) -> Self {
        self.metadata.fee = Some(Fee {
            amount,
            currency: Some("LBC".to_string()),
            address: None,
        });
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, _uri: &str) -> Result<StreamMetadata, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.metadata.clone())
    }
}

/// Encrypt `chunks` as consecutive blobs plus a terminator and store them
///
/// Returns the descriptor hash. Entries are written to the descriptor in
/// the given `order` of blob numbers when one is supplied.
pub fn publish_stream(
    store: &MemoryBlobStore,
    chunks: &[Vec<u8>],
    order: Option<&[usize]>,
) -> String {
    let key = test_key();
    let mut blobs: Vec<BlobInfo> = chunks
        .iter()
        .enumerate()
        .map(|(num, chunk)| {
            let iv = BlobIv::new([num as u8; 16]);
            let ciphertext = encrypt_blob(chunk, &key, &iv);
            let hash = blob_hash(&ciphertext);
            let length = ciphertext.len() as u64;
            store.insert(&hash, ciphertext);
            BlobInfo::new(num as u32, hash, length, iv)
        })
        .collect();
    blobs.push(BlobInfo::terminator(
        chunks.len() as u32,
        BlobIv::new([0xFF; 16]),
    ));

    let json = StreamDescriptor::new("test.mp4", key, blobs).build().unwrap();
    let json = match order {
        Some(order) => reorder_entries(&json, order),
        None => json,
    };

    let sd_hash = blob_hash(&json);
    store.insert(&sd_hash, json);
    sd_hash
}

fn reorder_entries(json: &[u8], order: &[usize]) -> Vec<u8> {
    let mut doc: serde_json::Value = serde_json::from_slice(json).unwrap();
    let blobs = doc["blobs"].as_array().unwrap().clone();
    doc["blobs"] = serde_json::Value::Array(order.iter().map(|&i| blobs[i].clone()).collect());
    serde_json::to_vec(&doc).unwrap()
}
