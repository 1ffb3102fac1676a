//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! config.port
//!     → listener.rs (bind localhost:<port>)
//!     → Hand off to HTTP layer (axum::serve)
//! ```
//!
//! # Design Decisions
//! - Loopback only; the proxy is never exposed on other interfaces
//! - Bind failure is fatal at startup

pub mod listener;

pub use listener::{bind, ListenerError};
