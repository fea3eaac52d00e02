//! Serenity-backed implementation of the core `Platform` trait.
//!
//! Thin I/O wrappers only; every decision lives in `metroplex-core`. A 404
//! from the REST API maps to `Error::MissingArtifact` so the orchestrator
//! can treat independently deleted artifacts as recoverable.

use metroplex_core::{
    ChannelId, Error as CoreError, EventId, EventSnapshot, EventStatus, GuildId, MessageId,
    Platform, Result as CoreResult, RoleId, RsvpBoard, RsvpCategory, RsvpPrompt, UserId,
};
use serenity::all::{
    ButtonStyle, Colour, CreateActionRow, CreateButton, CreateEmbed, CreateMessage, CreateThread,
    EditMessage, EditRole, EditThread, ScheduledEvent, ScheduledEventStatus,
};
use serenity::http::{Http, HttpError, StatusCode};
use std::sync::Arc;

type SerGuildId = serenity::all::GuildId;
type SerChannelId = serenity::all::ChannelId;
type SerMessageId = serenity::all::MessageId;
type SerRoleId = serenity::all::RoleId;
type SerUserId = serenity::all::UserId;

/// Discord implementation of the platform collaborator
pub struct DiscordPlatform {
    http: Arc<Http>,
    guild_id: SerGuildId,
}

impl DiscordPlatform {
    /// Create a platform handle over a shared HTTP client.
    #[must_use]
    pub fn new(http: Arc<Http>, guild_id: GuildId) -> Self {
        Self {
            http,
            guild_id: SerGuildId::new(guild_id.get()),
        }
    }

    /// The shared HTTP client (used by the command surface for fetches).
    #[must_use]
    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }
}

fn ch(id: ChannelId) -> SerChannelId {
    SerChannelId::new(id.get())
}

fn map_err(kind: &'static str, e: serenity::Error) -> CoreError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) = &e {
        if resp.status_code == StatusCode::NOT_FOUND {
            return CoreError::MissingArtifact { kind };
        }
    }
    CoreError::Platform(e.to_string())
}

/// Convert a gateway scheduled event into the orchestrator's snapshot.
pub(crate) fn snapshot_from(event: &ScheduledEvent) -> EventSnapshot {
    EventSnapshot {
        id: EventId(event.id.get()),
        guild_id: GuildId(event.guild_id.get()),
        name: event.name.clone(),
        description: event.description.clone(),
        creator_id: UserId(event.creator_id.map(SerUserId::get).unwrap_or_default()),
        status: match event.status {
            ScheduledEventStatus::Scheduled => EventStatus::Scheduled,
            ScheduledEventStatus::Active => EventStatus::Active,
            ScheduledEventStatus::Completed => EventStatus::Completed,
            _ => EventStatus::Cancelled,
        },
    }
}

/// Component custom id carried by an RSVP button.
pub(crate) fn rsvp_custom_id(event: EventId, category: RsvpCategory) -> String {
    format!("rsvp:{}:{}", event, category.key())
}

/// Parse an RSVP button custom id back into its parts.
pub(crate) fn parse_rsvp_custom_id(custom_id: &str) -> Option<(EventId, RsvpCategory)> {
    let rest = custom_id.strip_prefix("rsvp:")?;
    let (event, key) = rest.split_once(':')?;
    Some((event.parse().ok()?, RsvpCategory::from_key(key)?))
}

fn summary_embed(event_name: &str, board: &RsvpBoard) -> CreateEmbed {
    let mut embed = CreateEmbed::new().title(format!("RSVP List: {event_name}"));
    for category in RsvpCategory::ALL {
        embed = embed.field(category.label(), board.render_category(category), true);
    }
    embed
}

fn prompt_embed(prompt: &RsvpPrompt) -> CreateEmbed {
    let mut embed = CreateEmbed::new().title(prompt.title());
    if let Some(description) = &prompt.description {
        embed = embed.description(description.clone());
    }
    embed
}

fn prompt_components(prompt: &RsvpPrompt) -> Vec<CreateActionRow> {
    let style = |category| match category {
        RsvpCategory::Going => ButtonStyle::Success,
        RsvpCategory::Maybe => ButtonStyle::Secondary,
        RsvpCategory::NotGoing => ButtonStyle::Danger,
    };
    let buttons = RsvpCategory::ALL
        .into_iter()
        .map(|category| {
            CreateButton::new(rsvp_custom_id(prompt.event_id, category))
                .label(category.label())
                .style(style(category))
                .disabled(prompt.selected == Some(category))
        })
        .collect();
    vec![CreateActionRow::Buttons(buttons)]
}

#[async_trait::async_trait]
impl Platform for DiscordPlatform {
    async fn send_message(&self, channel: ChannelId, text: &str) -> CoreResult<MessageId> {
        let message = ch(channel)
            .send_message(&self.http, CreateMessage::new().content(text))
            .await
            .map_err(|e| map_err("channel", e))?;
        Ok(MessageId(message.id.get()))
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> CoreResult<()> {
        ch(channel)
            .edit_message(
                &self.http,
                SerMessageId::new(message.get()),
                EditMessage::new().content(text),
            )
            .await
            .map_err(|e| map_err("message", e))?;
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> CoreResult<()> {
        ch(channel)
            .delete_message(&self.http, SerMessageId::new(message.get()))
            .await
            .map_err(|e| map_err("message", e))
    }

    async fn create_thread(
        &self,
        channel: ChannelId,
        root: MessageId,
        name: &str,
    ) -> CoreResult<ChannelId> {
        let thread = ch(channel)
            .create_thread_from_message(
                &self.http,
                SerMessageId::new(root.get()),
                CreateThread::new(name),
            )
            .await
            .map_err(|e| map_err("message", e))?;
        Ok(ChannelId(thread.id.get()))
    }

    async fn rename_thread(&self, thread: ChannelId, name: &str) -> CoreResult<()> {
        ch(thread)
            .edit_thread(&self.http, EditThread::new().name(name))
            .await
            .map_err(|e| map_err("thread", e))?;
        Ok(())
    }

    async fn create_role(&self, name: &str, colour: u32) -> CoreResult<RoleId> {
        let role = self
            .guild_id
            .create_role(
                &self.http,
                EditRole::new()
                    .name(name)
                    .colour(Colour::new(colour))
                    .mentionable(true),
            )
            .await
            .map_err(|e| map_err("role", e))?;
        Ok(RoleId(role.id.get()))
    }

    async fn rename_role(&self, role: RoleId, name: &str) -> CoreResult<()> {
        self.guild_id
            .edit_role(
                &self.http,
                SerRoleId::new(role.get()),
                EditRole::new().name(name),
            )
            .await
            .map_err(|e| map_err("role", e))?;
        Ok(())
    }

    async fn delete_role(&self, role: RoleId) -> CoreResult<()> {
        self.guild_id
            .delete_role(&self.http, SerRoleId::new(role.get()))
            .await
            .map_err(|e| map_err("role", e))
    }

    async fn grant_role(&self, user: UserId, role: RoleId) -> CoreResult<()> {
        self.http
            .add_member_role(
                self.guild_id,
                SerUserId::new(user.get()),
                SerRoleId::new(role.get()),
                Some("interested in a scheduled event"),
            )
            .await
            .map_err(|e| map_err("role", e))
    }

    async fn revoke_role(&self, user: UserId, role: RoleId) -> CoreResult<()> {
        self.http
            .remove_member_role(
                self.guild_id,
                SerUserId::new(user.get()),
                SerRoleId::new(role.get()),
                Some("no longer interested in a scheduled event"),
            )
            .await
            .map_err(|e| map_err("role", e))
    }

    async fn role_colour(&self, role: RoleId) -> CoreResult<u32> {
        let roles = self
            .guild_id
            .roles(&self.http)
            .await
            .map_err(|e| map_err("role", e))?;
        roles
            .get(&SerRoleId::new(role.get()))
            .map(|r| r.colour.0)
            .ok_or(CoreError::MissingArtifact { kind: "role" })
    }

    async fn live_events(&self) -> CoreResult<Vec<EventSnapshot>> {
        let events = self
            .guild_id
            .scheduled_events(&self.http, false)
            .await
            .map_err(|e| map_err("guild", e))?;
        Ok(events
            .iter()
            .map(snapshot_from)
            .filter(|e| e.status.is_live())
            .collect())
    }

    async fn fetch_event(&self, event: EventId) -> CoreResult<Option<EventSnapshot>> {
        match self
            .guild_id
            .scheduled_event(&self.http, serenity::all::ScheduledEventId::new(event.get()), false)
            .await
        {
            Ok(found) => Ok(Some(snapshot_from(&found))),
            Err(e) => match map_err("event", e) {
                CoreError::MissingArtifact { .. } => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn event_subscribers(&self, event: EventId) -> CoreResult<Vec<UserId>> {
        let users = self
            .guild_id
            .scheduled_event_users(
                &self.http,
                serenity::all::ScheduledEventId::new(event.get()),
                None,
            )
            .await
            .map_err(|e| map_err("event", e))?;
        Ok(users.iter().map(|u| UserId(u.user.id.get())).collect())
    }

    async fn open_dm(&self, user: UserId) -> CoreResult<ChannelId> {
        let channel = SerUserId::new(user.get())
            .create_dm_channel(&self.http)
            .await
            .map_err(|e| map_err("user", e))?;
        Ok(ChannelId(channel.id.get()))
    }

    async fn send_dm(&self, user: UserId, text: &str) -> CoreResult<()> {
        let channel = self.open_dm(user).await?;
        self.send_message(channel, text)
            .await
            .map_err(|_| CoreError::DeliveryFailed { user })?;
        Ok(())
    }

    async fn send_rsvp_summary(
        &self,
        channel: ChannelId,
        event_name: &str,
        board: &RsvpBoard,
    ) -> CoreResult<MessageId> {
        let message = ch(channel)
            .send_message(
                &self.http,
                CreateMessage::new().embed(summary_embed(event_name, board)),
            )
            .await
            .map_err(|e| map_err("channel", e))?;
        Ok(MessageId(message.id.get()))
    }

    async fn edit_rsvp_summary(
        &self,
        channel: ChannelId,
        message: MessageId,
        event_name: &str,
        board: &RsvpBoard,
    ) -> CoreResult<()> {
        ch(channel)
            .edit_message(
                &self.http,
                SerMessageId::new(message.get()),
                EditMessage::new().embed(summary_embed(event_name, board)),
            )
            .await
            .map_err(|e| map_err("message", e))?;
        Ok(())
    }

    async fn send_rsvp_prompt(
        &self,
        user: UserId,
        prompt: &RsvpPrompt,
    ) -> CoreResult<(ChannelId, MessageId)> {
        let channel = self
            .open_dm(user)
            .await
            .map_err(|_| CoreError::DeliveryFailed { user })?;
        let message = ch(channel)
            .send_message(
                &self.http,
                CreateMessage::new()
                    .embed(prompt_embed(prompt))
                    .components(prompt_components(prompt)),
            )
            .await
            .map_err(|_| CoreError::DeliveryFailed { user })?;
        Ok((channel, MessageId(message.id.get())))
    }

    async fn update_rsvp_prompt(
        &self,
        channel: ChannelId,
        message: MessageId,
        prompt: &RsvpPrompt,
        note: &str,
    ) -> CoreResult<()> {
        ch(channel)
            .edit_message(
                &self.http,
                SerMessageId::new(message.get()),
                EditMessage::new()
                    .content(note)
                    .embed(prompt_embed(prompt))
                    .components(prompt_components(prompt)),
            )
            .await
            .map_err(|e| map_err("message", e))?;
        Ok(())
    }
}
