//! Upstream response logging and relay to the client.
//!
//! # Responsibilities
//! - Write status, header values and body to the response channel
//! - Copy status and every header onto the client response
//! - Stream the body back and report a client that goes away mid-body
//!
//! # Design Decisions
//! - The body is buffered once for logging; the relay streams the same bytes
//! - Relay failures are reported on the error channel only; the client
//!   simply sees a truncated body

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{response::Parts, Response};
use futures_util::Stream;

use crate::http::body::{buffer_body, BufferedBody};
use crate::http::headers::{canonical_header_name, copy_response_headers};
use crate::observability::ProxyLogs;

/// Chunk size used while relaying a body to the client.
pub const RELAY_CHUNK_SIZE: usize = 32 * 1024;

/// Log `response` to the response channel and restore its body afterwards.
///
/// The buffered body is returned so the relay does not read it again.
pub async fn log_response(logs: &ProxyLogs, response: &mut Response<Body>) -> BufferedBody {
    logs.response(format_args!("Response: {}", response.status()));
    for (name, value) in response.headers() {
        logs.response(format_args!(
            "Response Header: {}: {}",
            canonical_header_name(name),
            String::from_utf8_lossy(value.as_bytes())
        ));
    }

    let buffered = buffer_body(std::mem::take(response.body_mut())).await;
    *response.body_mut() = buffered.replay();

    match &buffered.error {
        Some(e) => {
            logs.response(format_args!("Failed to read response body: {}", e));
            logs.error(format_args!("Failed to read response body: {}", e));
        }
        None => logs.response(format_args!("Response Body: {}", buffered.as_text())),
    }
    buffered
}

/// Build the client response: upstream status, all upstream headers, and the
/// already buffered body streamed through in chunks.
pub fn relay_response(logs: &ProxyLogs, parts: Parts, body: Bytes) -> Response<Body> {
    let mut response = Response::new(Body::from_stream(RelayBody::new(body, logs.clone())));
    *response.status_mut() = parts.status;
    copy_response_headers(&parts.headers, response.headers_mut());
    response
}

/// Body stream handing the relayed bytes to the connection chunk by chunk.
///
/// If it is dropped before every byte was taken, the client connection went
/// away and the truncation is written to the error channel.
pub struct RelayBody {
    remaining: Bytes,
    sent: usize,
    total: usize,
    logs: ProxyLogs,
}

impl RelayBody {
    pub fn new(bytes: Bytes, logs: ProxyLogs) -> Self {
        Self {
            total: bytes.len(),
            remaining: bytes,
            sent: 0,
            logs,
        }
    }
}

impl Stream for RelayBody {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.remaining.is_empty() {
            return Poll::Ready(None);
        }
        let len = self.remaining.len().min(RELAY_CHUNK_SIZE);
        let chunk = self.remaining.split_to(len);
        self.sent += len;
        Poll::Ready(Some(Ok(chunk)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = self.remaining.len().div_ceil(RELAY_CHUNK_SIZE);
        (chunks, Some(chunks))
    }
}

impl Drop for RelayBody {
    fn drop(&mut self) {
        if self.sent < self.total {
            self.logs.error(format_args!(
                "Failed to copy response body: client connection closed after {} of {} bytes",
                self.sent, self.total
            ));
        }
    }
}
