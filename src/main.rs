//! Standalone server binary.
//!
//! Loads configuration, wires up signal handling and the metrics
//! exporter, registers a built-in status route, and runs the server
//! until Ctrl+C. Embedding applications use [`vhost_http::HttpServer`]
//! directly instead.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use clap::Parser;
use tokio::net::TcpListener;

use vhost_http::config::load_config;
use vhost_http::lifecycle::{watch_signals, Shutdown};
use vhost_http::observability::{logging::init_tracing, metrics::init_metrics};
use vhost_http::routing::WILDCARD_HOST;
use vhost_http::{handler, HttpServer, Response, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "vhost-http", version, about = "Virtual-hosting HTTP(S) server")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Serve TLS using the configured [listener.tls] certificate.
    #[arg(long)]
    tls: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_tracing(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        log_dir = %config.logging.dir,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    let signal_watcher = shutdown.clone();
    tokio::spawn(async move {
        watch_signals(&signal_watcher).await;
    });

    let server = HttpServer::new(config)?;

    // Built-in liveness route, reachable on any hostname.
    server.add_method_callback(
        WILDCARD_HOST,
        Method::GET,
        "/status",
        None,
        handler(|_req| async { Ok(Response::text(StatusCode::OK, "ok")) }),
    )?;

    if cli.tls {
        let addr = server.config().listener.bind_address.parse()?;
        server.run_tls(addr, shutdown.subscribe()).await?;
    } else {
        let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
        server.run(listener, shutdown.subscribe()).await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
