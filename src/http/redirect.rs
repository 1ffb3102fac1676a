//! Redirection engine.
//!
//! # Pipeline (per request, no state carried between requests)
//! ```text
//! inbound request
//!     → CONNECT                          ── forward_proxy::tunnel
//!     → absolute-form (GET http://h/x)   ── forward_proxy::forward
//!     → log_request (request channel, body replayed)
//!     → parse target_server            ── fail → 500 "Invalid target server URL"
//!     → resolve path+query on target   ── fail → 500 "Failed to create request"
//!     → rewrite headers, build request ── fail → 500 "Failed to create request"
//!     → single upstream call           ── fail → 500 "Failed to connect to server"
//!     → log_response (response channel, body replayed)
//!     → relay status, headers, body to the client
//! ```
//!
//! Every failure is also written to the error channel.

use std::error::Error as StdError;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
        HeaderValue, Method, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::Instrument;
use url::{Position, Url};
use uuid::Uuid;

use crate::http::forward_proxy;
use crate::http::headers::rewrite_request_headers;
use crate::http::request::log_request;
use crate::http::response::{log_response, relay_response};
use crate::http::server::AppState;

/// Per-request failures. Each one ends the request with a 500.
#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("Invalid target server URL: {0}")]
    InvalidTarget(#[source] url::ParseError),

    #[error("Failed to create request: target {0} is not an http(s) URL with a host")]
    UnsupportedTarget(String),

    #[error("Failed to create request: {0}")]
    ResolveUrl(#[source] url::ParseError),

    #[error("Failed to create request: {0}")]
    BuildRequest(#[source] axum::http::Error),

    #[error("Failed to create request: CONNECT target {0} is not host:port")]
    InvalidConnectTarget(String),

    #[error("Failed to connect to server: {}", error_chain(.0))]
    Upstream(#[source] hyper_util::client::legacy::Error),

    #[error("Failed to connect to server: {0}")]
    Tunnel(#[source] std::io::Error),
}

impl RedirectError {
    /// Short message sent to the client.
    pub fn client_message(&self) -> &'static str {
        match self {
            RedirectError::InvalidTarget(_) => "Invalid target server URL",
            RedirectError::UnsupportedTarget(_)
            | RedirectError::ResolveUrl(_)
            | RedirectError::BuildRequest(_)
            | RedirectError::InvalidConnectTarget(_) => "Failed to create request",
            RedirectError::Upstream(_) | RedirectError::Tunnel(_) => {
                "Failed to connect to server"
            }
        }
    }
}

impl IntoResponse for RedirectError {
    fn into_response(self) -> Response {
        plain_text_error(StatusCode::INTERNAL_SERVER_ERROR, self.client_message())
    }
}

/// Plain-text error body, newline terminated.
pub fn plain_text_error(status: StatusCode, message: &str) -> Response {
    let mut response = (status, format!("{}\n", message)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

/// Render an error and all of its causes on one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Resolve the inbound request target against the configured base URL.
///
/// Absolute-path references (every origin-form request) keep the target's
/// scheme and authority and take the request's raw path and query. Only
/// literal `.` and `..` segments are removed from the path; the query and
/// any percent-encoding are sent exactly as received. Anything else goes
/// through generic reference resolution.
pub fn resolve_upstream_url(target: &Url, uri: &Uri) -> Result<Uri, RedirectError> {
    if !matches!(target.scheme(), "http" | "https") || !target.has_host() {
        return Err(RedirectError::UnsupportedTarget(target.to_string()));
    }

    let path = uri.path();
    let resolved = if path.starts_with('/') {
        let mut reference = remove_dot_segments(path);
        if let Some(query) = uri.query() {
            reference.push('?');
            reference.push_str(query);
        }
        format!(
            "{}://{}{}",
            target.scheme(),
            &target[Position::BeforeHost..Position::AfterPort],
            reference
        )
    } else {
        let reference = uri.path_and_query().map_or(path, |pq| pq.as_str());
        target.join(reference).map_err(RedirectError::ResolveUrl)?.into()
    };

    Uri::try_from(resolved).map_err(|e| RedirectError::BuildRequest(e.into()))
}

/// RFC 3986 §5.2.4 on an absolute path, matching literal segments only.
fn remove_dot_segments(path: &str) -> String {
    let mut output: Vec<&str> = Vec::new();
    let mut trailing_slash = false;

    for segment in path.split('/').skip(1) {
        trailing_slash = false;
        match segment {
            "." => trailing_slash = true,
            ".." => {
                output.pop();
                trailing_slash = true;
            }
            _ => output.push(segment),
        }
    }

    let mut normalized = format!("/{}", output.join("/"));
    if trailing_slash && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Axum entry point for every inbound request.
///
/// Proxy-form requests (CONNECT and absolute-form) are served as a plain
/// forward proxy; everything else is redirected to the target server.
pub async fn redirect_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let span = tracing::info_span!(
        "redirect",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        uri = %request.uri(),
    );

    async move {
        let result = if request.method() == Method::CONNECT {
            forward_proxy::tunnel(&state, request).await
        } else if request.uri().authority().is_some() {
            forward_proxy::forward(&state, request).await
        } else {
            redirect(&state, request).await
        };

        result.unwrap_or_else(|err| {
            tracing::debug!(error = %err, "Request failed");
            state.logs.error(&err);
            err.into_response()
        })
    }
    .instrument(span)
    .await
}

async fn redirect(state: &AppState, mut request: Request<Body>) -> Result<Response, RedirectError> {
    log_request(&state.logs, &mut request).await;

    let target = Url::parse(&state.target_server).map_err(RedirectError::InvalidTarget)?;
    let upstream_uri = resolve_upstream_url(&target, request.uri())?;

    let (parts, body) = request.into_parts();
    let mut outbound = Request::builder()
        .method(parts.method)
        .uri(upstream_uri)
        .body(body)
        .map_err(RedirectError::BuildRequest)?;
    *outbound.headers_mut() = rewrite_request_headers(&parts.headers);

    tracing::debug!(upstream = %outbound.uri(), "Redirecting request");

    let mut response = state
        .client
        .request(outbound)
        .await
        .map_err(RedirectError::Upstream)?
        .map(Body::new);

    let buffered = log_response(&state.logs, &mut response).await;
    let (parts, _) = response.into_parts();
    Ok(relay_response(&state.logs, parts, buffered.bytes))
}
