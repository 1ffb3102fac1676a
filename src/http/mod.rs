//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, fallback route, tracing)
//!     → redirect.rs (redirection pipeline)
//!         → forward_proxy.rs (absolute-form and CONNECT requests)
//!         → request.rs (log request, replay body)
//!         → headers.rs (rewrite outbound headers)
//!         → client.rs (single upstream call)
//!         → response.rs (log response, relay to client)
//!     → Send to client
//! ```

pub mod body;
pub mod client;
pub mod forward_proxy;
pub mod headers;
pub mod redirect;
pub mod request;
pub mod response;
pub mod server;

pub use client::{build_upstream_client, UpstreamClient};
pub use redirect::{redirect_handler, RedirectError};
pub use server::{AppState, HttpServer};
