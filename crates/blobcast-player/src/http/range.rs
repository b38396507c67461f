//! Byte-range responses over a seekable stream
//!
//! Range handling follows the usual `ServeContent` conventions: a missing
//! header serves the whole body, a single satisfiable range gets a 206, and
//! several ranges fall back to the full body rather than a multipart reply.

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use blobcast_protocol::{StreamError, StreamHandle, StreamMetrics, Whence};
use bytes::Bytes;
use std::io;
use std::sync::Arc;

const BYTES_UNIT: &str = "bytes=";

/// What to send for a `Range` header against a body of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// 200 with the whole body
    Full,
    /// 206 with `length` bytes from `start`
    Partial {
        /// First byte offset
        start: u64,
        /// Number of bytes
        length: u64,
    },
    /// 416
    Unsatisfiable,
}

/// Interpret a `Range` header for a body of `size` bytes.
#[must_use]
pub fn parse_range(header: Option<&str>, size: u64) -> RangeSpec {
    let Some(header) = header.map(str::trim).filter(|h| !h.is_empty()) else {
        return RangeSpec::Full;
    };
    let Some(specs) = header.strip_prefix(BYTES_UNIT) else {
        return RangeSpec::Unsatisfiable;
    };

    let mut ranges = Vec::new();
    let mut no_overlap = false;

    for part in specs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((start, end)) = part.split_once('-') else {
            return RangeSpec::Unsatisfiable;
        };
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            // Suffix range: the last `end` bytes
            let Ok(suffix) = end.parse::<u64>() else {
                return RangeSpec::Unsatisfiable;
            };
            if suffix == 0 || size == 0 {
                no_overlap = true;
                continue;
            }
            let suffix = suffix.min(size);
            ranges.push((size - suffix, suffix));
            continue;
        }

        let Ok(first) = start.parse::<u64>() else {
            return RangeSpec::Unsatisfiable;
        };
        if first >= size {
            no_overlap = true;
            continue;
        }

        let length = if end.is_empty() {
            size - first
        } else {
            let Ok(last) = end.parse::<u64>() else {
                return RangeSpec::Unsatisfiable;
            };
            if last < first {
                return RangeSpec::Unsatisfiable;
            }
            last.min(size - 1) - first + 1
        };
        ranges.push((first, length));
    }

    match ranges.as_slice() {
        [] if no_overlap && size == 0 => RangeSpec::Full,
        [] if no_overlap => RangeSpec::Unsatisfiable,
        [(start, length)] => RangeSpec::Partial {
            start: *start,
            length: *length,
        },
        _ => RangeSpec::Full,
    }
}

/// Build the response for `range` over an open stream.
///
/// The body is produced lazily, one read per chunk, so blobs are only
/// fetched as the client consumes them.
///
/// # Errors
///
/// Returns `StreamError` if the stream cannot be positioned.
pub fn serve_content(
    mut handle: StreamHandle,
    range: Option<&str>,
    read_buffer_size: usize,
    metrics: Option<Arc<StreamMetrics>>,
) -> Result<Response, StreamError> {
    let size = handle.seek(0, Whence::End)?;
    let content_type = handle.content_type().to_string();

    let (status, start, length) = match parse_range(range, size) {
        RangeSpec::Full => (StatusCode::OK, 0, size),
        RangeSpec::Partial { start, length } => (StatusCode::PARTIAL_CONTENT, start, length),
        RangeSpec::Unsatisfiable => {
            tracing::debug!(uri = %handle.uri(), range = ?range, size, "unsatisfiable range");
            return Ok((
                StatusCode::RANGE_NOT_SATISFIABLE,
                [
                    (header::CONTENT_RANGE, format!("bytes */{size}")),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                "invalid range: failed to overlap",
            )
                .into_response());
        }
    };

    let offset = i64::try_from(start).map_err(|_| StreamError::SeekOverflow(i128::from(start)))?;
    handle.seek(offset, Whence::Start)?;

    tracing::debug!(
        uri = %handle.uri(),
        status = status.as_u16(),
        start,
        length,
        size,
        "serving stream"
    );

    let body = body_stream(handle, length, read_buffer_size.max(1), metrics);

    let mut headers = vec![
        (header::CONTENT_TYPE, content_type),
        (header::ACCEPT_RANGES, "bytes".to_string()),
        (header::CONTENT_LENGTH, length.to_string()),
    ];
    if status == StatusCode::PARTIAL_CONTENT {
        headers.push((
            header::CONTENT_RANGE,
            format!("bytes {start}-{}/{size}", start + length - 1),
        ));
    }

    let mut response = (status, body).into_response();
    for (name, value) in headers {
        match value.parse::<HeaderValue>() {
            Ok(value) => {
                response.headers_mut().insert(name, value);
            }
            Err(e) => tracing::warn!(header = %name, "dropping invalid header value: {e}"),
        }
    }
    Ok(response)
}

struct BodyState {
    handle: StreamHandle,
    remaining: u64,
    chunk_size: usize,
    metrics: Option<Arc<StreamMetrics>>,
}

fn body_stream(
    handle: StreamHandle,
    length: u64,
    chunk_size: usize,
    metrics: Option<Arc<StreamMetrics>>,
) -> Body {
    let state = BodyState {
        handle,
        remaining: length,
        chunk_size,
        metrics,
    };

    let chunks = futures::stream::try_unfold(state, |mut state| async move {
        if state.remaining == 0 {
            return Ok(None);
        }

        let want = usize::try_from(state.remaining)
            .map_or(state.chunk_size, |r| r.min(state.chunk_size));
        let mut buf = vec![0u8; want];

        let n = match state.handle.read(&mut buf).await {
            Ok(0) => {
                tracing::warn!(
                    uri = %state.handle.uri(),
                    position = state.handle.position(),
                    remaining = state.remaining,
                    "stream ended before the announced length"
                );
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended before the announced length",
                ));
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    uri = %state.handle.uri(),
                    position = state.handle.position(),
                    "error reading stream: {e}"
                );
                return Err(io::Error::from(e));
            }
        };

        buf.truncate(n);
        state.remaining -= n as u64;
        if let Some(metrics) = &state.metrics {
            metrics.record_bytes_served(n as u64);
        }

        Ok(Some((Bytes::from(buf), state)))
    });

    Body::from_stream(chunks)
}
