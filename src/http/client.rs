//! Upstream HTTP client.
//!
//! One client is built at startup and shared by every request. It speaks
//! HTTP/1.1 to `http://` targets directly and to `https://` targets over
//! rustls with the webpki root store. Each request is a single attempt; no
//! timeout is applied to the upstream call.

use axum::body::Body;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

/// Client type stored in the server state.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the shared upstream client.
pub fn build_upstream_client() -> Result<UpstreamClient, rustls::Error> {
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
        .https_or_http()
        .enable_http1()
        .build();

    Ok(Client::builder(TokioExecutor::new()).build(connector))
}
