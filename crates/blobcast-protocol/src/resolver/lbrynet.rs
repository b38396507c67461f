//! lbrynet JSON-RPC resolver

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Fee, Resolver, StreamMetadata};
use crate::error::ResolveError;
use crate::retry::RetryPolicy;
use crate::transport::HttpClient;

/// Resolver backed by an lbrynet daemon's `resolve` method
#[derive(Debug)]
pub struct LbrynetResolver {
    http: HttpClient,
    endpoint: String,
    retry_policy: RetryPolicy,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: ResolveParams<'a>,
    id: u64,
}

#[derive(Serialize)]
struct ResolveParams<'a> {
    urls: [&'a str; 1],
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<HashMap<String, ResolvedClaim>>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ResolvedClaim {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    value_type: Option<String>,
    #[serde(default)]
    value: Option<ClaimValue>,
}

#[derive(Deserialize)]
struct ClaimValue {
    #[serde(default)]
    source: Option<ClaimSource>,
    #[serde(default)]
    fee: Option<ClaimFee>,
}

#[derive(Deserialize)]
struct ClaimSource {
    #[serde(default)]
    sd_hash: String,
    #[serde(default)]
    media_type: String,
    #[serde(default)]
    size: Option<NumberOrString>,
}

#[derive(Deserialize)]
struct ClaimFee {
    #[serde(default)]
    amount: Option<NumberOrString>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

// lbrynet writes protobuf numbers as JSON strings; older daemons used numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrString {
    fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl LbrynetResolver {
    /// Create a resolver for the daemon at `endpoint`
    pub fn new(endpoint: impl Into<String>, http: HttpClient, retry_policy: RetryPolicy) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            retry_policy,
            next_id: AtomicU64::new(1),
        }
    }

    /// Daemon endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn resolve_once(&self, uri: &str) -> Result<StreamMetadata, ResolveError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method: "resolve",
            params: ResolveParams { urls: [uri] },
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        let body =
            serde_json::to_vec(&request).map_err(|e| ResolveError::Malformed(e.to_string()))?;

        let response = self
            .http
            .inner()
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status(status));
        }

        let bytes = response.bytes().await?;
        parse_resolve_response(uri, &bytes)
    }
}

#[async_trait]
impl Resolver for LbrynetResolver {
    async fn resolve(&self, uri: &str) -> Result<StreamMetadata, ResolveError> {
        tracing::debug!(uri, endpoint = %self.endpoint, "resolving claim");
        self.retry_policy.execute(|| self.resolve_once(uri)).await
    }
}

fn parse_resolve_response(uri: &str, body: &[u8]) -> Result<StreamMetadata, ResolveError> {
    let response: RpcResponse =
        serde_json::from_slice(body).map_err(|e| ResolveError::Malformed(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(ResolveError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let mut result = response
        .result
        .ok_or_else(|| ResolveError::Malformed("response has neither result nor error".into()))?;

    // The daemon may normalize the URI used as key.
    let claim = match result.remove(uri) {
        Some(claim) => claim,
        None => result
            .into_values()
            .next()
            .ok_or_else(|| ResolveError::Malformed(format!("no entry for {uri}")))?,
    };

    if let Some(error) = claim.error {
        let reason = error
            .get("text")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| error.to_string(), ToString::to_string);
        return Err(ResolveError::NotFound {
            uri: uri.to_string(),
            reason,
        });
    }

    if let Some(value_type) = claim.value_type.as_deref()
        && value_type != "stream"
    {
        return Err(ResolveError::NotAStream {
            uri: uri.to_string(),
            value_type: value_type.to_string(),
        });
    }

    let value = claim.value.ok_or_else(|| ResolveError::NotFound {
        uri: uri.to_string(),
        reason: "claim has no value".to_string(),
    })?;

    let source = value
        .source
        .filter(|s| !s.sd_hash.is_empty())
        .ok_or_else(|| ResolveError::NotAStream {
            uri: uri.to_string(),
            value_type: claim.value_type.unwrap_or_else(|| "sourceless".to_string()),
        })?;

    let source_hash = hex::decode(&source.sd_hash)
        .map_err(|e| ResolveError::Malformed(format!("invalid sd_hash: {e}")))?;

    let size = source.size.as_ref().and_then(NumberOrString::as_u64).unwrap_or(0);

    let fee = value
        .fee
        .map(|fee| {
            let amount = match &fee.amount {
                Some(amount) => amount
                    .as_f64()
                    .filter(|amount| amount.is_finite())
                    .ok_or_else(|| ResolveError::Malformed("invalid fee amount".into()))?,
                None => 0.0,
            };
            Ok::<_, ResolveError>(Fee {
                amount,
                currency: fee.currency,
                address: fee.address,
            })
        })
        .transpose()?;

    Ok(StreamMetadata {
        source_hash,
        media_type: source.media_type,
        size,
        fee,
    })
}
