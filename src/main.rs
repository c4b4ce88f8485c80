//! Circuit breaker registry service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ request id ─▶ logging ─▶ timeout ─▶ auth ─▶ handler
//!                                                                  │
//!                                                                  ▼
//!                                                        ┌──────────────────┐
//!                                                        │ storage (DashMap)│
//!                                                        └──────────────────┘
//!
//!     Cross-cutting: config, observability, lifecycle (signals → shutdown)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use circuit_breaker_service::config::load_config;
use circuit_breaker_service::lifecycle::{shutdown_signal, Shutdown};
use circuit_breaker_service::observability::{logging, metrics};
use circuit_breaker_service::storage::{EntryStorage, MapStorage};
use circuit_breaker_service::HttpServer;

const EXIT_CONFIG: u8 = 1;
const EXIT_LOGGING: u8 = 2;
const EXIT_SERVER: u8 = 3;

#[derive(Parser)]
#[command(name = "circuit-breaker-service")]
#[command(about = "Circuit breaker registry over HTTP", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "./config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging is not up yet, so config errors go to stderr.
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {e}", args.config.display());
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::from(EXIT_LOGGING);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?config,
        "circuit-breaker-service starting"
    );

    if config.observability.metrics_enabled {
        if let Err(e) = metrics::init_metrics(&config.observability.metrics_address) {
            tracing::error!(error = %e, "Metrics exporter disabled");
        }
    }

    let storage: Arc<EntryStorage> = Arc::new(MapStorage::new());
    let shutdown = Shutdown::new();

    let listener = match TcpListener::bind(config.api.bind_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(
                address = %config.api.bind_address(),
                error = %e,
                "Failed to bind listener"
            );
            return ExitCode::from(EXIT_SERVER);
        }
    };

    tokio::spawn(shutdown_signal(shutdown.clone()));

    let server = HttpServer::new(&config, storage.clone(), shutdown.clone());
    let served = server.run(listener).await;

    // Serving may have failed without a signal; stop the signal task either way.
    shutdown.trigger();
    if let Err(e) = storage.shutdown(&CancellationToken::new()).await {
        tracing::warn!(error = %e, "Storage shutdown failed");
    }

    match served {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "HTTP server failed");
            ExitCode::from(EXIT_SERVER)
        }
    }
}
