//! Error types for metroplex-core
//!
//! Command-surface failures carry a user-visible reason; lifecycle failures
//! are reported to the operator contact by the dispatcher.

use crate::ids::UserId;
use crate::tags::Tag;
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Event name carries no routing tag; the event stays unmanaged until renamed
    #[error("no routing tag found in event name: {name}")]
    Unclassified {
        /// The offending event name
        name: String,
    },

    /// A routing tag has no audience role configured
    #[error("no audience role configured for tag {tag}")]
    UnmappedTag {
        /// The unmapped tag
        tag: Tag,
    },

    /// A derived artifact no longer exists on the platform
    #[error("{kind} no longer exists")]
    MissingArtifact {
        /// Artifact kind ("role", "thread", "message")
        kind: &'static str,
    },

    /// RSVP collection was already started for this event
    #[error("RSVP collection has already started for this event")]
    AlreadyCollecting,

    /// RSVP collection has not started for this event
    #[error("RSVP collection has not started for this event")]
    NotCollecting,

    /// A private message to a subscriber was rejected
    #[error("could not deliver a direct message to {user}")]
    DeliveryFailed {
        /// The unreachable subscriber
        user: UserId,
    },

    /// Command invoked by the wrong actor or in the wrong place
    #[error("{0}")]
    Precondition(String),

    /// Timed out waiting for a concurrent provisioning call to finish
    #[error("timed out waiting for event artifacts to be provisioned")]
    ProvisionTimeout,

    /// Chat platform call failed
    #[error("platform error: {0}")]
    Platform(String),

    /// Record store I/O failure
    #[error("record store io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record store (de)serialization failure
    #[error("record store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
