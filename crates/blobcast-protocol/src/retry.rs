//! Retry policy with exponential backoff
//!
//! Only the resolver goes through this. Blob and descriptor fetches fail
//! fast so a stalled request surfaces to the HTTP client immediately.

use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::error::ResolveError;

/// Errors that can tell whether another attempt may succeed
pub trait Retryable {
    fn should_retry(&self) -> bool;
}

impl Retryable for ResolveError {
    fn should_retry(&self) -> bool {
        Self::should_retry(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the first call
    pub max_attempts: u32,

    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,

    /// Backoff multiplier
    pub multiplier: f64,

    /// Add up to 30% random delay to each backoff
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Create retry policy from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create retry policy from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            max_attempts: lookup("BLOBCAST_RESOLVE_MAX_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            initial_backoff: lookup("BLOBCAST_RETRY_BACKOFF")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.initial_backoff, Duration::from_millis),
            max_backoff: lookup("BLOBCAST_MAX_BACKOFF")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.max_backoff, Duration::from_millis),
            multiplier: lookup("BLOBCAST_BACKOFF_MULTIPLIER")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.multiplier),
            jitter: lookup("BLOBCAST_RETRY_JITTER")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jitter),
        }
    }

    /// Execute a function with retry logic
    pub async fn execute<F, Fut, T, E>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.should_retry() || attempt >= self.max_attempts => {
                    return Err(e);
                }
                Err(e) => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "request failed, retrying");

                    let mut delay = backoff;
                    if self.jitter {
                        let jitter = rand::rng().random_range(0.0..0.3);
                        #[allow(clippy::cast_precision_loss)]
                        let jitter_ms = (delay.as_millis() as f64 * jitter) as u64;
                        delay += Duration::from_millis(jitter_ms);
                    }

                    tokio::time::sleep(delay).await;

                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );
                }
            }
        }
    }
}
