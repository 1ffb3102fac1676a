//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Open log channels → Build client → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger → server stops accepting → in-flight requests finish → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and exits non-zero
//! - Listener binds last, after logs are writable

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::StartupError;
