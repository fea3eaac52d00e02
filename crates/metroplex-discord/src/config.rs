//! Discord gateway configuration.

use crate::error::{Error, Result};
use serde::Deserialize;

/// Discord bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// Bot token (from DISCORD_BOT_TOKEN env)
    pub bot_token: String,
}

impl DiscordConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let bot_token = std::env::var("DISCORD_BOT_TOKEN")
            .map_err(|_| Error::Client("DISCORD_BOT_TOKEN not set".to_string()))?;
        Ok(Self { bot_token })
    }
}
