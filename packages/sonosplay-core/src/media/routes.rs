//! HTTP handler for the single served file.
//!
//! Every request goes through one fallback handler: the router has exactly one
//! valid path, chosen per session, so path matching happens here instead of in
//! the route table.

use std::io::SeekFrom;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use super::{mime_for_path, MediaHandle};

/// Per-session router state.
#[derive(Clone)]
pub(crate) struct MediaState {
    pub handle: Arc<MediaHandle>,
    /// Cancelled when the session stops; ends in-flight bodies.
    pub shutdown: CancellationToken,
}

/// Builds the router for one serving session.
pub(crate) fn create_router(state: MediaState) -> Router {
    Router::new().fallback(serve_media).with_state(state)
}

/// Outcome of interpreting a `Range` header against a file length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteRange {
    /// Serve the whole file (no header, or one we do not honor).
    Full,
    /// Serve `start..=end`.
    Partial { start: u64, end: u64 },
    /// Start lies beyond the end of the file.
    Unsatisfiable,
}

/// Interprets a single `bytes=a-b` or `bytes=a-` range.
///
/// Suffix ranges (`bytes=-n`), multi-range requests and malformed headers
/// fall back to the full file. The end is clamped to the last byte.
pub(crate) fn parse_byte_range(header: Option<&str>, total_len: u64) -> ByteRange {
    let Some(spec) = header.map(str::trim).and_then(|h| h.strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((start_s, end_s)) = spec.split_once('-') else {
        return ByteRange::Full;
    };
    let Ok(start) = start_s.trim().parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = match end_s.trim() {
        "" => u64::MAX,
        s => match s.parse::<u64>() {
            Ok(end) if end >= start => end,
            _ => return ByteRange::Full,
        },
    };

    if start >= total_len {
        return ByteRange::Unsatisfiable;
    }
    ByteRange::Partial {
        start,
        end: end.min(total_len - 1),
    }
}

/// Returns true if `path` is exactly `/{url_path}`.
fn matches_handle(path: &str, handle: &MediaHandle) -> bool {
    path.strip_prefix('/') == Some(handle.url_path.as_str())
}

async fn serve_media(
    State(state): State<MediaState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, HeaderValue::from_static("GET, HEAD"))],
        )
            .into_response();
    }

    let handle = &state.handle;
    if !matches_handle(uri.path(), handle) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let mut file = match tokio::fs::File::open(&handle.file_path).await {
        Ok(file) => file,
        Err(e) => {
            log::warn!(
                "[MediaServer] Cannot open {}: {}",
                handle.file_path.display(),
                e
            );
            return StatusCode::NOT_FOUND.into_response();
        }
    };
    let total_len = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(e) => {
            log::warn!(
                "[MediaServer] Cannot stat {}: {}",
                handle.file_path.display(),
                e
            );
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let range = parse_byte_range(
        headers.get(header::RANGE).and_then(|v| v.to_str().ok()),
        total_len,
    );

    let (status, start, len) = match range {
        ByteRange::Full => (StatusCode::OK, 0, total_len),
        ByteRange::Partial { start, end } => (StatusCode::PARTIAL_CONTENT, start, end - start + 1),
        ByteRange::Unsatisfiable => {
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_RANGE, format!("bytes */{}", total_len)),
                ],
            )
                .into_response();
        }
    };

    log::debug!(
        "[MediaServer] {} {} ({:?})",
        method,
        handle.file_name,
        range
    );

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, mime_for_path(&handle.file_path))
        .header(header::CONTENT_LENGTH, len.to_string())
        .header(header::ACCEPT_RANGES, "bytes");
    if let ByteRange::Partial { start, end } = range {
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", start, end, total_len),
        );
    }

    if method == Method::HEAD {
        return builder
            .body(Body::empty())
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }

    if start > 0 {
        if let Err(e) = file.seek(SeekFrom::Start(start)).await {
            log::warn!("[MediaServer] Seek to {} failed: {}", start, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let body = ReaderStream::new(file.take(len)).take_until(state.shutdown.cancelled_owned());

    builder
        .body(Body::from_stream(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
