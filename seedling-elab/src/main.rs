//! seedling-elab - seed elaboration microservice
//!
//! Default port 5790. Serves the elaboration API under `/seeds/:seed_id/...`
//! and a public `/health` endpoint.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

use seedling_elab::config::ElabConfig;
use seedling_elab::{AppState, ElaborationEngine};

#[derive(Parser, Debug)]
#[command(name = "seedling-elab")]
#[command(about = "Seed elaboration microservice")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "SEEDLING_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database (also read from SEEDLING_ROOT_FOLDER)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "SEEDLING_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "SEEDLING_HOST")]
    host: String,

    /// SQLite database path (relative paths resolve under the root folder)
    #[arg(long, env = "SEEDLING_DATABASE")]
    database: Option<PathBuf>,

    /// Accepted bearer token (repeatable; comma separated in the environment)
    #[arg(long = "auth-token", env = "SEEDLING_AUTH_TOKENS", value_delimiter = ',')]
    auth_tokens: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_file = args
        .config
        .clone()
        .or_else(|| seedling_common::config::default_config_file().ok())
        .filter(|path| path.exists());
    let mut config = ElabConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database) = args.database.clone() {
        config.database_path = Some(database);
    }
    if !args.auth_tokens.is_empty() {
        config.auth.tokens = args.auth_tokens.clone();
    }

    seedling_common::logging::init_tracing(&config.logging)
        .context("Failed to initialize logging")?;

    info!(
        "Starting seedling-elab v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_file {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }

    let root_folder = config.root_folder(args.root_folder.as_deref());
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let db_path = config.database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let db_pool = seedling_elab::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let schema = config.build_schema()?;
    info!(
        fields = schema.fields().len(),
        required = schema.required_count(),
        "Metadata schema loaded"
    );

    let extractor = config.build_extractor()?;
    info!(
        extractor = extractor.name(),
        timeout_ms = config.extraction.timeout_ms,
        "Extraction adapter ready"
    );

    if config.auth.tokens.is_empty() {
        warn!("No auth tokens configured: authentication DISABLED (development mode)");
    } else {
        info!(tokens = config.auth.tokens.len(), "Bearer token authentication enabled");
    }

    let engine = ElaborationEngine::new(db_pool, std::sync::Arc::new(schema), extractor)
        .with_extraction_timeout(config.extraction_timeout());
    let state = AppState::new(engine, config.auth.tokens.clone());
    let app = seedling_elab::build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
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
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
