use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vidtube_api::config::{AppConfig, StoreBackend};
use vidtube_api::database::{MemoryStore, PgStore, Store};
use vidtube_api::media::LocalMediaStorage;
use vidtube_api::{router, AppState};

#[derive(Parser)]
#[command(name = "vidtube-api")]
#[command(about = "VidTube API server")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Bind address (overrides HOST)")]
    host: Option<String>,

    #[arg(long, help = "Listen port (overrides PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Store backend: postgres or memory (overrides STORE_BACKEND)")]
    store: Option<StoreBackend>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, secrets, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidtube_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(store) = cli.store {
        config.database.backend = store;
    }
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting VidTube API in {:?} mode", config.environment);

    let store: Arc<dyn Store> = match config.database.backend {
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database).await.context("connecting to postgres")?;
            store.ensure_schema().await.context("creating collection tables")?;
            tracing::info!("Using postgres store");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    tokio::fs::create_dir_all(&config.media.public_dir)
        .await
        .with_context(|| format!("creating {}", config.media.public_dir.display()))?;
    tokio::fs::create_dir_all(&config.media.upload_dir)
        .await
        .with_context(|| format!("creating {}", config.media.upload_dir.display()))?;
    let media = LocalMediaStorage::from_config(&config.media).context("media storage")?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app = router(AppState::new(store, Arc::new(media), config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("VidTube API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server")?;
    Ok(())
}
