//! Platform capability trait.
//!
//! Everything the orchestrator needs from the chat platform, as thin I/O
//! operations. The serenity adapter implements this for Discord; tests
//! implement it with in-memory fakes.

use crate::error::Result;
use crate::event::EventSnapshot;
use crate::ids::{ChannelId, EventId, MessageId, RoleId, UserId};
use crate::rsvp::{RsvpBoard, RsvpPrompt};

/// Chat-platform collaborator consumed by the orchestrator
#[async_trait::async_trait]
pub trait Platform: Send + Sync {
    /// Post a message in a channel or thread.
    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<MessageId>;

    /// Replace the content of a previously sent message.
    async fn edit_message(&self, channel: ChannelId, message: MessageId, text: &str) -> Result<()>;

    /// Delete a message. Missing messages yield [`crate::Error::MissingArtifact`].
    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()>;

    /// Create a discussion thread rooted at an existing message.
    async fn create_thread(
        &self,
        channel: ChannelId,
        root: MessageId,
        name: &str,
    ) -> Result<ChannelId>;

    /// Rename a thread.
    async fn rename_thread(&self, thread: ChannelId, name: &str) -> Result<()>;

    /// Create a mentionable role with the given name and colour.
    async fn create_role(&self, name: &str, colour: u32) -> Result<RoleId>;

    /// Rename a role.
    async fn rename_role(&self, role: RoleId, name: &str) -> Result<()>;

    /// Delete a role. Missing roles yield [`crate::Error::MissingArtifact`].
    async fn delete_role(&self, role: RoleId) -> Result<()>;

    /// Grant a role to a guild member.
    async fn grant_role(&self, user: UserId, role: RoleId) -> Result<()>;

    /// Revoke a role from a guild member.
    async fn revoke_role(&self, user: UserId, role: RoleId) -> Result<()>;

    /// Colour of an existing role (for inheritance by interest roles).
    async fn role_colour(&self, role: RoleId) -> Result<u32>;

    /// Current live scheduled events of the guild.
    async fn live_events(&self) -> Result<Vec<EventSnapshot>>;

    /// One scheduled event, or `None` if the platform no longer knows it.
    async fn fetch_event(&self, event: EventId) -> Result<Option<EventSnapshot>>;

    /// Users currently marked interested in an event.
    async fn event_subscribers(&self, event: EventId) -> Result<Vec<UserId>>;

    /// Open (or reuse) the private channel with a user.
    async fn open_dm(&self, user: UserId) -> Result<ChannelId>;

    /// Send a direct message to a user.
    async fn send_dm(&self, user: UserId, text: &str) -> Result<()>;

    /// Post the shared RSVP summary message in a channel.
    async fn send_rsvp_summary(
        &self,
        channel: ChannelId,
        event_name: &str,
        board: &RsvpBoard,
    ) -> Result<MessageId>;

    /// Re-render the shared RSVP summary message in place.
    async fn edit_rsvp_summary(
        &self,
        channel: ChannelId,
        message: MessageId,
        event_name: &str,
        board: &RsvpBoard,
    ) -> Result<()>;

    /// Send a per-subscriber RSVP prompt as a direct message.
    ///
    /// Returns the DM channel and the prompt message id so the prompt can be
    /// updated and eventually deleted.
    async fn send_rsvp_prompt(
        &self,
        user: UserId,
        prompt: &RsvpPrompt,
    ) -> Result<(ChannelId, MessageId)>;

    /// Update a prompt after an answer: `note` replaces the content, the
    /// chosen affordance is disabled and the other two re-enabled.
    async fn update_rsvp_prompt(
        &self,
        channel: ChannelId,
        message: MessageId,
        prompt: &RsvpPrompt,
        note: &str,
    ) -> Result<()>;
}
