//! Header rewriting for redirected requests.
//!
//! # Rules
//! - `Host` is dropped; the client derives it from the upstream URL
//! - `User-Agent` collapses to exactly one fixed value, present or not
//! - Every other header is copied value by value, in order
//! - `X-Added-Header` is set last and overrides any inbound copy
//!
//! Forward-proxied traffic keeps its headers except the hop-by-hop ones.

use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, CONNECTION, HOST, PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE, USER_AGENT,
};

/// Value every outbound `User-Agent` is replaced with.
pub static CUSTOM_USER_AGENT: HeaderValue = HeaderValue::from_static("MyCustomUserAgent");

/// Header added to every outbound request.
pub static X_ADDED_HEADER: HeaderName = HeaderName::from_static("x-added-header");
pub static ADDED_HEADER_VALUE: HeaderValue = HeaderValue::from_static("HeaderValue");

/// Build the outbound header map from the inbound one.
pub fn rewrite_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len() + 2);

    for (name, value) in inbound.iter() {
        if name == HOST || name == USER_AGENT {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }

    outbound.insert(USER_AGENT, CUSTOM_USER_AGENT.clone());
    outbound.insert(X_ADDED_HEADER.clone(), ADDED_HEADER_VALUE.clone());
    outbound
}

static PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");
static KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// Remove connection-scoped headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }

    for name in [
        &CONNECTION,
        &PROXY_CONNECTION,
        &KEEP_ALIVE,
        &PROXY_AUTHENTICATE,
        &PROXY_AUTHORIZATION,
        &TE,
        &TRAILER,
        &TRANSFER_ENCODING,
        &UPGRADE,
    ] {
        headers.remove(name);
    }
}

/// Header name as written in the log channels: `content-type` becomes
/// `Content-Type`. Names with bytes outside `[A-Za-z0-9-]` are left as is.
pub fn canonical_header_name(name: &HeaderName) -> String {
    let raw = name.as_str();
    if !raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return raw.to_string();
    }

    let mut canonical = String::with_capacity(raw.len());
    let mut upper = true;
    for c in raw.chars() {
        canonical.push(if upper { c.to_ascii_uppercase() } else { c });
        upper = c == '-';
    }
    canonical
}

/// Copy every response header, all values, untouched.
pub fn copy_response_headers(upstream: &HeaderMap, client: &mut HeaderMap) {
    for (name, value) in upstream.iter() {
        client.append(name.clone(), value.clone());
    }
}
