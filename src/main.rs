//! crmdesk Server
//!
//! Serves the frontend bundle and the CRM JSON API.
//!
//! Run with: cargo run --bin crmdesk -- [--config path/to/config.toml]
//!
//! Configuration comes from the first config file found (see
//! `crmdesk::config::Config::load_default`) with environment overrides such
//! as `PORT`, `CRMDESK_STATIC_DIR`, `CRMDESK_DATA_DIR`, `EVOLUTION_API_URL`
//! and `N8N_URL`. `RUST_LOG` overrides the configured log level.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use crmdesk::api::{serve, AppState};
use crmdesk::config::Config;
use crmdesk::storage::CrmStore;

#[derive(Parser)]
#[command(name = "crmdesk")]
#[command(author, version, about = "CRM desk server", long_about = None)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "CRMDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Port override
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // The configured subscriber needs the config; log the load itself to stderr
    let mut config = tracing::subscriber::with_default(crmdesk::logging::bootstrap(), || {
        Config::load_default(args.config.as_deref())
    })?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    crmdesk::logging::init(&config.logging);

    tracing::info!("Starting crmdesk v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Data directory: {}", config.storage.data_dir);
    tracing::info!("Static directory: {}", config.server.static_dir);

    if !config.server.index_path().exists() {
        tracing::warn!(
            "Index document {:?} not found; page requests will return 404 until the bundle is built",
            config.server.index_path()
        );
    }

    let store = CrmStore::open(config.storage.store_config())
        .await?
        .with_gateway_default(config.evolution.gateway_defaults());
    tracing::info!("Store opened: {}", store.stats().await);

    if config.evolution.api_key.is_empty() {
        tracing::warn!("EVOLUTION_API_KEY not set; messaging features need gateway settings");
    }

    let state = AppState::new(Arc::new(store), config);
    serve(state).await?;

    Ok(())
}
