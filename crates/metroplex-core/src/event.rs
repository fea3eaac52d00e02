//! Event snapshots and lifecycle signals.
//!
//! A snapshot is the orchestrator's view of one platform scheduled event at
//! the moment a signal arrived. Signals form a closed set routed by an
//! explicit dispatcher; each variant carries only the fields its handler
//! needs.

use crate::ids::{EventId, GuildId, UserId};
use serde::{Deserialize, Serialize};

/// Platform lifecycle status of a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Scheduled for the future
    Scheduled,
    /// Currently happening
    Active,
    /// Finished
    Completed,
    /// Cancelled by the organizer
    Cancelled,
}

impl EventStatus {
    /// Whether the event still counts as live (managed artifacts kept).
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Scheduled | Self::Active)
    }
}

/// Point-in-time view of a platform scheduled event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Stable external identifier
    pub id: EventId,
    /// Owning guild
    pub guild_id: GuildId,
    /// Display name (may carry a routing tag)
    pub name: String,
    /// Organizer-provided description
    pub description: Option<String>,
    /// Event creator
    pub creator_id: UserId,
    /// Current lifecycle status
    pub status: EventStatus,
}

impl EventSnapshot {
    /// Canonical link to the event, as rendered in announcements.
    #[must_use]
    pub fn link(&self) -> String {
        format!("https://discord.com/events/{}/{}", self.guild_id, self.id)
    }
}

/// A lifecycle signal delivered by the platform.
///
/// Delivery is neither ordered nor exactly-once, so every handler validates
/// against the record store before acting.
#[derive(Debug, Clone)]
pub enum LifecycleSignal {
    /// A new event was created
    Created(EventSnapshot),
    /// An existing event changed (name, description, status, ...)
    Updated(EventSnapshot),
    /// A user marked themselves interested
    Subscribed {
        /// The event
        event_id: EventId,
        /// The interested user
        user_id: UserId,
    },
    /// A user withdrew their interest
    Unsubscribed {
        /// The event
        event_id: EventId,
        /// The departing user
        user_id: UserId,
    },
    /// The event was deleted on the platform
    Removed {
        /// The event
        event_id: EventId,
    },
}

impl LifecycleSignal {
    /// The event this signal concerns.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        match self {
            Self::Created(snapshot) | Self::Updated(snapshot) => snapshot.id,
            Self::Subscribed { event_id, .. }
            | Self::Unsubscribed { event_id, .. }
            | Self::Removed { event_id } => *event_id,
        }
    }
}
