//! Metroplex - guild event lifecycle orchestrator
//!
//! Binary entry point: loads configuration, opens the record store and
//! hands control to the Discord adapter.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use metroplex_core::{JsonRecordStore, MetroplexConfig, RecordStore};
use metroplex_discord::DiscordConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metroplex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = PathBuf::from(
        std::env::var("METROPLEX_CONFIG").unwrap_or_else(|_| "metroplex.toml".to_string()),
    );
    let config = Arc::new(
        MetroplexConfig::from_path(&config_path)
            .with_context(|| format!("loading config from {}", config_path.display()))?,
    );

    let store: Arc<dyn RecordStore> = Arc::new(
        JsonRecordStore::open(config.record_store_path.clone()).with_context(|| {
            format!(
                "opening record store at {}",
                config.record_store_path.display()
            )
        })?,
    );

    let discord = DiscordConfig::from_env().context("reading Discord credentials")?;

    info!(
        guild_id = %config.guild_id,
        store = %config.record_store_path.display(),
        "Metroplex starting"
    );

    metroplex_discord::run(config, discord, store)
        .await
        .context("running Discord adapter")?;
    Ok(())
}
