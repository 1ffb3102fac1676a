//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router: every method and path falls through to the
//!   redirection engine
//! - Wire up HTTP tracing
//! - Serve on a bound listener until the shutdown signal fires

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::client::UpstreamClient;
use crate::http::redirect::redirect_handler;
use crate::observability::ProxyLogs;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Raw target base URL; parsed on every request.
    pub target_server: Arc<str>,
    pub logs: ProxyLogs,
    pub client: UpstreamClient,
}

/// HTTP server for the redirecting proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig, logs: ProxyLogs, client: UpstreamClient) -> Self {
        let state = AppState {
            target_server: Arc::from(config.target_server.as_str()),
            logs,
            client,
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(redirect_handler)
            .with_state(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// Router serving every request; useful for driving the server in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target_server = %self.config.target_server,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
