//! lern-curriculum - Curriculum linking, mastery and quality audit service
//!
//! Runs as an HTTP service (`serve`) or executes one pipeline run from the
//! command line (`link`, `validate`, `audit`) and prints its JSON report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lern_common::config::{load_config, resolve_config_path, LernConfig, CONFIG_ENV_VAR};
use lern_curriculum::oracle::{OpenAiOracle, Oracle};
use lern_curriculum::services::{self, LinkingOptions, ValidationOptions};
use lern_curriculum::AppState;
use serde::Serialize;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for lern-curriculum
#[derive(Parser, Debug)]
#[command(name = "lern-curriculum")]
#[command(about = "Curriculum linking, mastery tracking and content quality audit")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(short, long, env = "LERN_PORT")]
        port: Option<u16>,
    },

    /// Link content to curriculum competencies
    Link {
        /// Only this app
        #[arg(long)]
        app: Option<String>,

        /// Items per oracle call (overrides linking.batch_size)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Ask the oracle but write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Re-check existing app/competency pairings
    Validate {
        #[arg(long)]
        app: Option<String>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Review unverified AI-generated content
    Audit {
        /// Items to review (overrides audit.default_limit)
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("lern-curriculum {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: built-in defaults"),
    }

    let db = lern_common::db::init_database(&config.database)
        .await
        .context("Failed to open database")?;
    info!("Database: {}", config.database.path.display());

    let api_key = lern_curriculum::config::resolve_oracle_api_key(&db, &config.oracle).await?;
    let oracle: Arc<dyn Oracle> = Arc::new(
        OpenAiOracle::new(&config.oracle, api_key).context("Failed to build oracle client")?,
    );
    info!("Oracle: {} at {}", oracle.id(), config.oracle.base_url);

    match args.command {
        Command::Serve { port } => serve(db, oracle, config, config_path, port).await,
        Command::Link {
            app,
            batch_size,
            dry_run,
        } => {
            let options = LinkingOptions {
                app_id: app,
                batch_size,
                dry_run,
            };
            let report = services::run_linking(&db, oracle.as_ref(), &config, &options).await?;
            print_report(&report)
        }
        Command::Validate { app, dry_run } => {
            let options = ValidationOptions { app_id: app, dry_run };
            let report = services::run_validation(&db, oracle.as_ref(), &config, &options).await?;
            print_report(&report)
        }
        Command::Audit { limit } => {
            let report = services::run_audit(&db, oracle.as_ref(), &config, limit).await?;
            print_report(&report)
        }
    }
}

async fn serve(
    db: SqlitePool,
    oracle: Arc<dyn Oracle>,
    config: LernConfig,
    config_path: Option<PathBuf>,
    port: Option<u16>,
) -> Result<()> {
    let host = config.server.host.clone();
    let port = port.unwrap_or(config.server.port);

    let state = AppState::new(db, oracle, config).with_config_path(config_path);
    let app = lern_curriculum::build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

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

fn print_report<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
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
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
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
