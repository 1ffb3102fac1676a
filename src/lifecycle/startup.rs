//! Startup orchestration.
//!
//! # Order
//! 1. Load configuration
//! 2. Open the request/response/error log channels
//! 3. Build the upstream client
//! 4. Bind the loopback listener
//! 5. Serve until shutdown
//!
//! Any failure before step 5 is fatal: nothing is served on a partial startup.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::{load_config, ConfigError};
use crate::http::{build_upstream_client, HttpServer};
use crate::net::{self, ListenerError};
use crate::observability::{FileSink, ProxyLogs, SinkError};

/// Fatal errors raised before (or while) serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to load config: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open log channels: {0}")]
    Logs(#[from] SinkError),

    #[error("Failed to build upstream client: {0}")]
    Client(#[from] rustls::Error),

    #[error("ListenAndServe: {0}")]
    Bind(#[from] ListenerError),

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Load `config_path`, start the proxy, and serve until `shutdown` fires.
pub async fn run(config_path: &Path, shutdown: broadcast::Receiver<()>) -> Result<(), StartupError> {
    let config = load_config(config_path)?;
    tracing::info!(
        config = %config_path.display(),
        port = %config.port,
        target_server = %config.target_server,
        "Configuration loaded"
    );

    let logs = ProxyLogs::new(Arc::new(FileSink::from_config(&config.observability)?));
    let client = build_upstream_client()?;

    let listener = match net::bind(&config).await {
        Ok(listener) => listener,
        Err(e) => {
            let err = StartupError::Bind(e);
            logs.error(&err);
            return Err(err);
        }
    };
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Starting proxy server on {}", addr);
    }

    HttpServer::new(config, logs, client)
        .run(listener, shutdown)
        .await
        .map_err(StartupError::Serve)
}
