//! Configuration schema definitions.
//!
//! All types derive Serde traits and default every field, so a config file
//! that omits a key (or an empty file) still loads.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for the redirecting proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Port to listen on (loopback only). Empty means an ephemeral port.
    #[serde(deserialize_with = "port_from_scalar")]
    pub port: String,

    /// Absolute base URL every request is redirected to.
    pub target_server: String,

    /// Request/response/error log channel settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Address handed to the listener, always on the loopback interface.
    pub fn listen_address(&self) -> String {
        let port = self.port.trim();
        if port.is_empty() {
            "localhost:0".to_string()
        } else {
            format!("localhost:{}", port)
        }
    }
}

/// Log channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Directory holding `request.log`, `response.log` and `error.log`.
    pub log_dir: PathBuf,

    /// Mirror every channel to stdout/stderr.
    pub console: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            console: true,
        }
    }
}

/// Accept `port: 8080` as well as `port: "8080"`.
fn port_from_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Text(String),
        Number(u64),
    }

    Ok(match PortValue::deserialize(deserializer)? {
        PortValue::Text(text) => text,
        PortValue::Number(number) => number.to_string(),
    })
}
