//! Metroplex Core - Event-Lifecycle Orchestration
//!
//! Tracks guild scheduled events and keeps a cluster of derived artifacts
//! (announcement, discussion thread, interest role, RSVP tracking) consistent
//! under concurrent, out-of-order and partially-failed platform signals:
//! - durable event-id to artifact mapping (write-through JSON record store)
//! - idempotent provisioning and best-effort teardown
//! - full reconciliation to recover from signals missed while offline
//! - shared three-category RSVP summary with per-subscriber prompts
//!
//! The chat platform itself is behind the [`Platform`] trait; the serenity
//! adapter lives in `metroplex-discord`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod ids;
pub mod lifecycle;
pub mod platform;
pub mod provision;
pub mod rsvp;
pub mod store;
pub mod tags;
pub mod teardown;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::MetroplexConfig;
pub use error::{Error, Result};
pub use event::{EventSnapshot, EventStatus, LifecycleSignal};
pub use ids::{ChannelId, EventId, GuildId, MessageId, RoleId, UserId};
pub use lifecycle::Orchestrator;
pub use platform::Platform;
pub use rsvp::{RsvpBoard, RsvpCategory, RsvpCollector, RsvpPrompt};
pub use store::{EventArtifacts, JsonRecordStore, RecordStore};
pub use tags::Tag;
