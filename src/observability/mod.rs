//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Redirection pipeline produces:
//!     → sink.rs (request / response / error channels)
//!         → logs/<channel>.log (append-only)
//!         → stdout (request, response) / stderr (error)
//!
//! Everything else produces:
//!     → logging.rs (tracing events on stderr, RUST_LOG filter)
//! ```
//!
//! # Design Decisions
//! - Channels are opened once at startup and passed explicitly to handlers
//! - Channel writes never fail the request that produced them

pub mod logging;
pub mod sink;

pub use sink::{Channel, FileSink, LogSink, MemorySink, ProxyLogs, SinkError};
