//! Orchestrator configuration.
//!
//! One TOML document wires the bot to a guild: where announcements go, who
//! the operator contact is, and which audience role each routing tag pings.

use crate::error::{Error, Result};
use crate::ids::{ChannelId, GuildId, RoleId, UserId};
use crate::tags::Tag;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn default_store_path() -> PathBuf {
    PathBuf::from("events.json")
}

fn default_reconcile_interval() -> u64 {
    300
}

/// Metroplex configuration document
#[derive(Debug, Clone, Deserialize)]
pub struct MetroplexConfig {
    /// Guild the bot manages events for
    pub guild_id: GuildId,
    /// Channel where announcements are posted
    pub announcement_channel_id: ChannelId,
    /// Operator contact for classification failures and handler errors
    pub operator_id: UserId,
    /// Routing tag to audience role mapping
    pub audience_roles: HashMap<Tag, RoleId>,
    /// Path of the record store document
    #[serde(default = "default_store_path")]
    pub record_store_path: PathBuf,
    /// Seconds between full reconciliation passes
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    /// Channel for member-join greetings (disabled when unset)
    #[serde(default)]
    pub greet_channel_id: Option<ChannelId>,
}

impl MetroplexConfig {
    /// Load the configuration from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.audience_roles.is_empty() {
            return Err(Error::Config(
                "audience_roles must map at least one tag".to_string(),
            ));
        }
        Ok(())
    }

    /// Audience role for a routing tag.
    pub fn audience_role(&self, tag: Tag) -> Result<RoleId> {
        self.audience_roles
            .get(&tag)
            .copied()
            .ok_or(Error::UnmappedTag { tag })
    }
}
