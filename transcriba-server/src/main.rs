//! transcriba-server - REST backend of the Transcriba transcription game

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use transcriba_common::config::{RootFolderInitializer, RootFolderResolver, TranscribaConfig};
use transcriba_common::db::init_database;
use transcriba_server::remote::HttpRemoteSource;
use transcriba_server::services::rbac;
use transcriba_server::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "transcriba-server")]
#[command(about = "Backend of the Transcriba manuscript transcription game")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "TRANSCRIBA_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding database, imports and assets
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on, overrides the configured port
    #[arg(short, long, env = "TRANSCRIBA_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transcriba_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Transcriba server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config = TranscribaConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let root_folder = RootFolderResolver::new(args.root_folder.as_deref(), &config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;
    let paths = initializer.paths(&config);
    std::fs::create_dir_all(&paths.imports)
        .with_context(|| format!("Cannot create {}", paths.imports.display()))?;
    info!("Database path: {}", paths.database.display());
    info!("Import directory: {}", paths.imports.display());

    let pool = match init_database(&paths.database).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    rbac::bootstrap(&pool, &config)
        .await
        .context("Failed to set up roles and accounts")?;

    let remote = HttpRemoteSource::new()?;
    let addr = format!(
        "{}:{}",
        config.server.host,
        args.port.unwrap_or(config.server.port)
    );

    let state = AppState::new(pool, config, paths, Arc::new(remote));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot bind {}", addr))?;
    info!("transcriba-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
