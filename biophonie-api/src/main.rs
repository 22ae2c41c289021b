//! biophonie-api - geopoint soundscape service
//!
//! `biophonie-api [serve]` runs the HTTP service.
//! `biophonie-api add-account <name> [--admin]` registers an account and prints its token.

use std::path::PathBuf;

use anyhow::{Context, Result};
use biophonie_common::config::{Config, ConfigOverrides};
use biophonie_common::db::init_database;
use biophonie_api::db::accounts::create_account;
use biophonie_api::{build_router, AppState};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for biophonie-api
#[derive(Parser, Debug)]
#[command(name = "biophonie-api")]
#[command(about = "Geopoint soundscape service")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "BIOPHONIE_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder for the database and public files
    #[arg(short, long, env = "BIOPHONIE_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, env = "BIOPHONIE_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// GeoJSON snapshot file
    #[arg(long, env = "BIOPHONIE_SNAPSHOT_PATH")]
    snapshot_path: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "BIOPHONIE_BIND_ADDR")]
    bind_addr: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "BIOPHONIE_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Register an account and print its API token
    AddAccount {
        name: String,
        /// Grant admin rights
        #[arg(long)]
        admin: bool,
    },
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            root_folder: self.root_folder.clone(),
            database_path: self.database_path.clone(),
            snapshot_path: self.snapshot_path.clone(),
            bind_addr: self.bind_addr.clone(),
            port: self.port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::resolve(&args.overrides()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let level = &config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "biophonie_api={level},biophonie_common={level},tower_http={level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting biophonie-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    config
        .ensure_directories()
        .context("Failed to create data directories")?;
    info!("Database path: {}", config.database_path.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::AddAccount { name, admin } => {
            let (account, token) = create_account(&pool, &name, admin)
                .await
                .with_context(|| format!("Failed to create account {}", name))?;
            info!("Created account {} (id {}, admin: {})", account.name, account.id, account.admin);
            println!("{}", token);
            Ok(())
        }
        Command::Serve => serve(config, pool).await,
    }
}

async fn serve(config: Config, pool: sqlx::SqlitePool) -> Result<()> {
    let state = AppState::new(
        pool,
        config.snapshot_path.clone(),
        config.assets_folder.clone(),
        config.limits.clone(),
    );

    // The snapshot must reflect the store before any request is served
    let features = state
        .snapshot
        .full_refresh()
        .await
        .context("Failed to build GeoJSON snapshot")?;
    info!(
        "✓ Snapshot {} written with {} features",
        config.snapshot_path.display(),
        features
    );

    let app = build_router(state);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("biophonie-api listening on http://{}", addr);
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
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
