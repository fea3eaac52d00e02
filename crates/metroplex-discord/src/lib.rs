//! Discord adapter for the Metroplex event orchestrator.
//!
//! Connects a serenity gateway client to `metroplex-core`: gateway events
//! become lifecycle signals, slash commands and RSVP buttons route to the
//! orchestrator, and the core's `Platform` trait is implemented over the
//! Discord REST API. A background task runs the periodic reconcile pass so
//! events that ended while the gateway was down are still torn down.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod commands;
pub mod config;
pub mod error;
pub mod handler;

pub use adapter::DiscordPlatform;
pub use config::DiscordConfig;
pub use error::{Error, Result};
pub use handler::Handler;

use metroplex_core::{MetroplexConfig, Orchestrator, RecordStore};
use serenity::all::GatewayIntents;
use serenity::http::Http;
use serenity::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build the orchestrator around a Discord platform and run the gateway
/// client until it stops.
pub async fn run(
    config: Arc<MetroplexConfig>,
    discord: DiscordConfig,
    store: Arc<dyn RecordStore>,
) -> Result<()> {
    let http = Arc::new(Http::new(&discord.bot_token));
    let platform = Arc::new(DiscordPlatform::new(http, config.guild_id));
    let orchestrator = Arc::new(Orchestrator::new(platform, store, config.clone()));

    spawn_reconciler(orchestrator.clone(), config.reconcile_interval_secs);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_SCHEDULED_EVENTS
        | GatewayIntents::DIRECT_MESSAGES;

    let mut client = Client::builder(&discord.bot_token, intents)
        .event_handler(Handler::new(orchestrator))
        .await
        .map_err(|e| Error::Client(e.to_string()))?;

    info!(guild_id = %config.guild_id, "Starting Discord gateway client");
    client
        .start()
        .await
        .map_err(|e| Error::Client(e.to_string()))
}

/// Periodic reconcile pass. The first tick fires immediately, catching
/// events that ended while the process was down.
fn spawn_reconciler(orchestrator: Arc<Orchestrator>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            match orchestrator.reconcile().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Reconcile pass tore down ended events"),
                Err(e) => warn!(error = %e, "Reconcile pass failed"),
            }
        }
    });
}
