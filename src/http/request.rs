//! Inbound request logging.
//!
//! # Responsibilities
//! - Write method and URL, one line per header value, and the body to the
//!   request channel. Header names are written in canonical form and `Host`
//!   is left out (it is part of the request line, not a header)
//! - Leave the request body readable for the forwarding step
//!
//! # Design Decisions
//! - The body is drained once and replaced with a replay of the same bytes
//! - A body read failure is logged and never aborts the request

use axum::body::Body;
use axum::http::{header::HOST, Request};

use crate::http::body::buffer_body;
use crate::http::headers::canonical_header_name;
use crate::observability::ProxyLogs;

/// Log `request` to the request channel and restore its body afterwards.
pub async fn log_request(logs: &ProxyLogs, request: &mut Request<Body>) {
    logs.request(format_args!("Request: {} {}", request.method(), request.uri()));
    for (name, value) in request.headers() {
        if name == HOST {
            continue;
        }
        logs.request(format_args!(
            "Request Header: {}: {}",
            canonical_header_name(name),
            String::from_utf8_lossy(value.as_bytes())
        ));
    }

    let buffered = buffer_body(std::mem::take(request.body_mut())).await;
    *request.body_mut() = buffered.replay();

    match &buffered.error {
        Some(e) => {
            logs.request(format_args!("Failed to read request body: {}", e));
            logs.error(format_args!(
                "Failed to read request body for {} {}: {}",
                request.method(),
                request.uri(),
                e
            ));
        }
        None => logs.request(format_args!("Request Body: {}", buffered.as_text())),
    }
}
