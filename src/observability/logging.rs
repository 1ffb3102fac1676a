//! Diagnostic logging.
//!
//! Process-level events (startup, bind, shutdown, HTTP traces) go through
//! `tracing` on stderr. Request/response/error records have their own
//! channels, see `sink.rs`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "redirect_proxy=info,tower_http=info";

/// Install the global tracing subscriber.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
