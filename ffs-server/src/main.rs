//! ffs-server - FindFavouriteSong tournament service
//!
//! Startup order: config file, tracing, root folder, database, HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ffs_common::config::{
    load_config_or_default, CompiledDefaults, RootFolderInitializer, RootFolderResolver,
};
use ffs_common::db::init_database;
use ffs_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for ffs-server
#[derive(Parser, Debug)]
#[command(name = "ffs-server")]
#[command(about = "Single-elimination playlist tournaments")]
#[command(version)]
struct Args {
    /// Folder holding the database
    #[arg(short, long, env = "FFS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Config file (default: ./ffs.toml, then the user config directory)
    #[arg(short, long, env = "FFS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "FFS_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "FFS_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let defaults = CompiledDefaults::for_current_platform();

    // Config is read before tracing exists; load problems surface as errors
    // below or as warnings once logging is up
    let config = load_config_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ffs-server v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = RootFolderResolver::new(args.root_folder, &config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e).context("Database initialization failed");
        }
    };

    let app = build_router(AppState::new(pool));

    let host = args
        .host
        .or(config.server.host)
        .unwrap_or(defaults.host);
    let port = args.port.or(config.server.port).unwrap_or(defaults.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("ffs-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
