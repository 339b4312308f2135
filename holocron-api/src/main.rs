//! holocron-api - read API for the Holocron catalog
//!
//! Serves species and starship records from the relational store, including
//! the family-grouped starship view.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use holocron_api::{build_router, AppState};
use holocron_common::config::{redact_url, resolve_database_url, TomlConfig};
use holocron_common::db::init_database;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 4000;

/// Command-line arguments for holocron-api
#[derive(Parser, Debug)]
#[command(name = "holocron-api")]
#[command(about = "Read API for the Holocron catalog")]
#[command(version)]
struct Args {
    /// Port to listen on (default 4000, or `api_port` from the config file)
    #[arg(short, long, env = "HOLOCRON_API_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "HOLOCRON_API_HOST")]
    host: String,

    /// Database connection string (overrides HOLOCRON_DATABASE_URL and the config file)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "holocron_api=info,holocron_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Holocron API v{}", env!("CARGO_PKG_VERSION"));

    let toml_config = TomlConfig::load_default();
    let database_url = resolve_database_url(args.database_url.as_deref(), &toml_config);
    info!("Database: {}", redact_url(&database_url));

    let pool = match init_database(&database_url).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e).context("Failed to initialize database");
        }
    };

    let app = build_router(AppState::new(pool));

    let port = args.port.or(toml_config.api_port).unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", args.host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("holocron-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
