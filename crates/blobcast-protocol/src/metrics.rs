//! Prometheus metrics for stream playback

use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};

/// Counters and latency histograms shared by every stream of a process
#[derive(Debug, Clone)]
pub struct StreamMetrics {
    registry: Registry,
    streams_opened: IntCounter,
    streams_failed: IntCounter,
    blobs_fetched: IntCounter,
    blobs_failed: IntCounter,
    blob_fetch_seconds: Histogram,
    first_blob_seconds: Histogram,
    bytes_decrypted: IntCounter,
    bytes_served: IntCounter,
}

impl StreamMetrics {
    /// Create a fresh registry with all stream metrics registered
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let streams_opened = IntCounter::new(
            "blobcast_streams_opened_total",
            "Streams that resolved and loaded their descriptor",
        )?;
        registry.register(Box::new(streams_opened.clone()))?;

        let streams_failed = IntCounter::new(
            "blobcast_streams_failed_total",
            "Stream requests that failed before any data was sent",
        )?;
        registry.register(Box::new(streams_failed.clone()))?;

        let blobs_fetched = IntCounter::new(
            "blobcast_blobs_fetched_total",
            "Blobs fetched and decrypted",
        )?;
        registry.register(Box::new(blobs_fetched.clone()))?;

        let blobs_failed = IntCounter::new(
            "blobcast_blobs_failed_total",
            "Blob fetches or decryptions that failed",
        )?;
        registry.register(Box::new(blobs_failed.clone()))?;

        let blob_fetch_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "blobcast_blob_fetch_seconds",
                "Time to download a single blob",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(blob_fetch_seconds.clone()))?;

        let first_blob_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "blobcast_first_blob_seconds",
                "Time from play request to the first blob being decrypted",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(first_blob_seconds.clone()))?;

        let bytes_decrypted = IntCounter::new(
            "blobcast_bytes_decrypted_total",
            "Plaintext bytes produced by blob decryption",
        )?;
        registry.register(Box::new(bytes_decrypted.clone()))?;

        let bytes_served = IntCounter::new(
            "blobcast_bytes_served_total",
            "Plaintext bytes handed to HTTP clients",
        )?;
        registry.register(Box::new(bytes_served.clone()))?;

        Ok(Self {
            registry,
            streams_opened,
            streams_failed,
            blobs_fetched,
            blobs_failed,
            blob_fetch_seconds,
            first_blob_seconds,
            bytes_decrypted,
            bytes_served,
        })
    }

    pub fn record_stream_opened(&self) {
        self.streams_opened.inc();
    }

    pub fn record_stream_failed(&self) {
        self.streams_failed.inc();
    }

    /// Record a successfully fetched and decrypted blob
    pub fn record_blob(&self, fetch_time: Duration, plaintext_len: usize) {
        self.blobs_fetched.inc();
        self.blob_fetch_seconds.observe(fetch_time.as_secs_f64());
        self.bytes_decrypted.inc_by(plaintext_len as u64);
    }

    pub fn record_blob_failed(&self) {
        self.blobs_failed.inc();
    }

    pub fn record_first_blob(&self, elapsed: Duration) {
        self.first_blob_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn record_bytes_served(&self, bytes: u64) {
        self.bytes_served.inc_by(bytes);
    }

    /// Get Prometheus registry for serving metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> String {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }
}
