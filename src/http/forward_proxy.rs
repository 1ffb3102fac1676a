//! Forward-proxy mode.
//!
//! Clients configured to use this process as an HTTP proxy send absolute-form
//! requests (`GET http://host/path`) and `CONNECT host:port`. Those are not
//! redirected: they go to the host they name, without the request/response
//! channels or the header rewrite.
//!
//! # Design Decisions
//! - Absolute-form requests are forwarded once with hop-by-hop headers removed
//!   in both directions; the body is streamed, not buffered
//! - CONNECT dials the upstream before answering, so an unreachable host is a
//!   500 rather than a tunnel that closes immediately
//! - Failures go to the error channel like any redirect failure

use axum::body::Body;
use axum::http::{header::HOST, Request};
use axum::response::Response;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::http::headers::strip_hop_by_hop;
use crate::http::redirect::RedirectError;
use crate::http::server::AppState;

/// Forward an absolute-form request to the URI it carries.
pub async fn forward(state: &AppState, request: Request<Body>) -> Result<Response, RedirectError> {
    let (mut parts, body) = request.into_parts();
    tracing::info!(method = %parts.method, uri = %parts.uri, "Proxying request");

    parts.headers.remove(HOST);
    strip_hop_by_hop(&mut parts.headers);

    let response = state
        .client
        .request(Request::from_parts(parts, body))
        .await
        .map_err(RedirectError::Upstream)?;

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    tracing::info!(status = %parts.status, "Proxied response");
    Ok(Response::from_parts(parts, Body::new(body)))
}

/// Open a TCP tunnel for a CONNECT request.
pub async fn tunnel(state: &AppState, request: Request<Body>) -> Result<Response, RedirectError> {
    let authority = request
        .uri()
        .authority()
        .filter(|authority| authority.port_u16().is_some())
        .map(|authority| authority.to_string())
        .ok_or_else(|| RedirectError::InvalidConnectTarget(request.uri().to_string()))?;

    let mut upstream = TcpStream::connect(&authority)
        .await
        .map_err(RedirectError::Tunnel)?;
    tracing::info!(%authority, "Tunnel established");

    let logs = state.logs.clone();
    tokio::spawn(
        async move {
            match hyper::upgrade::on(request).await {
                Ok(upgraded) => {
                    let mut client = TokioIo::new(upgraded);
                    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
                        Ok((from_client, from_server)) => {
                            tracing::debug!(from_client, from_server, "Tunnel closed");
                        }
                        Err(e) => tracing::debug!(error = %e, "Tunnel closed with error"),
                    }
                }
                Err(e) => logs.error(format_args!("Failed to upgrade CONNECT to {}: {}", authority, e)),
            }
        }
        .in_current_span(),
    );

    Ok(Response::new(Body::empty()))
}
