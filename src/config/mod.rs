//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML)
//!     → loader.rs (read, pick format, deserialize)
//!     → ProxyConfig (immutable)
//!     → shared read-only with the server and the log sink
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults so an empty file still loads
//! - The target URL is parsed per request, not at load time

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError, ConfigFormat};
pub use schema::{ObservabilityConfig, ProxyConfig};
