//! toggly-middleware demo service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ RequestIdLayer ──▶ ServiceInfoLayer ──▶ CatchPanicLayer
//!                        │                                         │
//!                        │  X-Toggly-Request-Id                    ▼
//!                        │                              version tag → access log
//!                        │                                         │  [START]
//!                        │                                         ▼
//!                        │                                     handlers
//!                        │                                         │  [END] / PANIC
//!     Client Response    ▼                                         │
//!     ◀────────────── id + X-Toggly-Service-* headers ◀────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use toggly_middleware::config::{load_config, ServiceConfig};
use toggly_middleware::observability::{logging, panic_hook, TracingSink};
use toggly_middleware::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "toggly-middleware", version, about = "Request-logging demo service")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.logging)?;
    panic_hook::install();

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        excluded = config.logging.exclude.len(),
        panic_policy = ?config.logging.panic_policy,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();

    let server = HttpServer::new(config, TracingSink::shared())?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
