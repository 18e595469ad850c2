//! `waypoint` server binary.
//!
//! Loads the configuration and route table, registers the built-in
//! `System` handlers, builds the application and serves it until SIGINT or
//! SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use waypoint::config::{load_config, AppConfig};
use waypoint::lifecycle::{forward_signals, Shutdown};
use waypoint::net::load_tls_config;
use waypoint::observability::{init_metrics, init_tracing};
use waypoint::session::InMemorySessionStore;
use waypoint::{Application, HttpServer, RouteTable, StartupError};

#[derive(Parser)]
#[command(name = "waypoint", version, about = "Route-table driven HTTP and JSON-RPC server")]
struct Args {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Route file, overriding `routes.path` from the configuration.
    #[arg(short, long)]
    routes: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path).map_err(StartupError::from)?,
        None => AppConfig::default(),
    };
    init_tracing(&config.observability).map_err(StartupError::from)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "waypoint starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        mcp_endpoint = %config.mcp.endpoint,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e| StartupError::Metrics(format!("{}: {e}", config.observability.metrics_address)))?;
        init_metrics(addr).map_err(|e| StartupError::Metrics(e.to_string()))?;
        tracing::info!(address = %addr, "Metrics exporter listening");
    }

    let routes_path = args
        .routes
        .unwrap_or_else(|| PathBuf::from(&config.routes.path));
    let table = RouteTable::from_file(&routes_path).map_err(StartupError::from)?;

    let app = Application::new(config.clone(), table)
        .with_system_handlers()
        .with_session_store(std::sync::Arc::new(InMemorySessionStore::new()))
        .build()
        .inspect_err(|e| tracing::error!(error = %e, "Refusing to start"))?;

    let shutdown = Shutdown::new();
    forward_signals(&shutdown);
    let server = HttpServer::new(app, config.clone());

    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config.listener.bind_address.parse().map_err(|e| StartupError::Bind {
                address: config.listener.bind_address.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
            })?;
            let rustls = load_tls_config(tls).await.map_err(StartupError::Tls)?;
            server
                .run_tls(addr, rustls, shutdown.wait())
                .await
                .map_err(StartupError::Serve)?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address)
                .await
                .map_err(|source| StartupError::Bind {
                    address: config.listener.bind_address.clone(),
                    source,
                })?;
            server
                .run(listener, shutdown.wait())
                .await
                .map_err(StartupError::Serve)?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
