//! Loopback TCP listener.
//!
//! # Responsibilities
//! - Bind `localhost:<port>` from the config
//! - Report bind failures as a startup error

use tokio::net::TcpListener;

use crate::config::ProxyConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind {
        address: String,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind { address, source } => {
                write!(f, "Failed to bind {}: {}", address, source)
            }
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
        }
    }
}

/// Bind the proxy's loopback listener.
pub async fn bind(config: &ProxyConfig) -> Result<TcpListener, ListenerError> {
    let address = config.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ListenerError::Bind {
            address: address.clone(),
            source,
        })?;

    let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
        address: address.clone(),
        source,
    })?;

    tracing::info!(
        address = %local_addr,
        "Listener bound"
    );

    Ok(listener)
}
