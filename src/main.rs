//! Redirecting HTTP proxy.
//!
//! Every request received on `localhost:<port>` is logged, rewritten to the
//! configured target server, forwarded once, and its response is logged and
//! relayed back to the client.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │               REDIRECT PROXY                 │
//!     Client Request    │  ┌──────────┐   ┌─────────┐   ┌───────────┐  │
//!     ──────────────────┼─▶│   net    │──▶│  http   │──▶│ redirect  │──┼──▶ Target
//!                       │  │ listener │   │ server  │   │  engine   │  │    Server
//!     Client Response   │  └──────────┘   └─────────┘   └─────┬─────┘  │
//!     ◀─────────────────┼──────────────── relay ◀─────────────┘        │
//!                       │                                              │
//!                       │  ┌────────────────────────────────────────┐  │
//!                       │  │ observability: request / response /    │  │
//!                       │  │ error channels → logs/*.log + console  │  │
//!                       │  └────────────────────────────────────────┘  │
//!                       └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use redirect_proxy::lifecycle::{signals, startup, Shutdown};
use redirect_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "redirect-proxy")]
#[command(about = "Logging HTTP proxy that redirects every request to one target server", long_about = None)]
struct Cli {
    /// Path to the YAML (or .toml) configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing();

    tracing::info!("redirect-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        trigger.trigger();
    });

    match startup::run(&cli.config, server_shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup error");
            ExitCode::FAILURE
        }
    }
}
