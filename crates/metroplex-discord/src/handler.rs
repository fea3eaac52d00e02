//! Gateway event handler.
//!
//! Translates serenity gateway events into lifecycle signals and routes
//! interactions to the command surface. All behaviour lives in the
//! orchestrator; this layer only converts and forwards.

use crate::adapter::{parse_rsvp_custom_id, snapshot_from};
use crate::commands;
use metroplex_core::{Error as CoreError, EventId, LifecycleSignal, Orchestrator, UserId};
use serenity::all::{
    ComponentInteraction, Context, CreateInteractionResponse, CreateInteractionResponseMessage,
    EventHandler, GuildScheduledEventUserAddEvent, GuildScheduledEventUserRemoveEvent, Interaction,
    Member, Ready, ScheduledEvent,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Serenity event handler wired to the orchestrator.
pub struct Handler {
    orchestrator: Arc<Orchestrator>,
}

impl Handler {
    /// Create a handler around a shared orchestrator.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    fn managed_guild(&self) -> u64 {
        self.orchestrator.config().guild_id.get()
    }

    async fn handle_component(&self, ctx: &Context, component: &ComponentInteraction) {
        let Some((event_id, category)) = parse_rsvp_custom_id(&component.data.custom_id) else {
            warn!(
                custom_id = %component.data.custom_id,
                "Ignoring component interaction with unknown custom id"
            );
            return;
        };

        let user_id = UserId(component.user.id.get());
        let response = match self
            .orchestrator
            .answer_rsvp(event_id, user_id, category)
            .await
        {
            // The collector re-renders the prompt message itself, so the
            // interaction only needs a silent acknowledgement.
            Ok(_) => CreateInteractionResponse::Acknowledge,
            Err(CoreError::NotCollecting) => CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content("RSVP collection for this event has ended."),
            ),
            Err(e) => {
                error!(%event_id, %user_id, error = %e, "Failed to record RSVP answer");
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("Something went wrong recording your answer, please try again."),
                )
            }
        };

        if let Err(e) = component.create_response(&ctx.http, response).await {
            error!(error = %e, "Failed to respond to RSVP component interaction");
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(bot = %ready.user.name, "Discord gateway connected");

        let guild = serenity::all::GuildId::new(self.managed_guild());
        if let Err(e) = guild.set_commands(&ctx.http, commands::definitions()).await {
            error!(error = %e, "Failed to register guild commands");
        }
    }

    async fn guild_scheduled_event_create(&self, _ctx: Context, event: ScheduledEvent) {
        if event.guild_id.get() != self.managed_guild() {
            return;
        }
        self.orchestrator
            .handle(LifecycleSignal::Created(snapshot_from(&event)))
            .await;
    }

    async fn guild_scheduled_event_update(&self, _ctx: Context, event: ScheduledEvent) {
        if event.guild_id.get() != self.managed_guild() {
            return;
        }
        self.orchestrator
            .handle(LifecycleSignal::Updated(snapshot_from(&event)))
            .await;
    }

    async fn guild_scheduled_event_delete(&self, _ctx: Context, event: ScheduledEvent) {
        if event.guild_id.get() != self.managed_guild() {
            return;
        }
        self.orchestrator
            .handle(LifecycleSignal::Removed {
                event_id: EventId(event.id.get()),
            })
            .await;
    }

    async fn guild_scheduled_event_user_add(
        &self,
        _ctx: Context,
        subscribed: GuildScheduledEventUserAddEvent,
    ) {
        if subscribed.guild_id.get() != self.managed_guild() {
            return;
        }
        self.orchestrator
            .handle(LifecycleSignal::Subscribed {
                event_id: EventId(subscribed.scheduled_event_id.get()),
                user_id: UserId(subscribed.user_id.get()),
            })
            .await;
    }

    async fn guild_scheduled_event_user_remove(
        &self,
        _ctx: Context,
        unsubscribed: GuildScheduledEventUserRemoveEvent,
    ) {
        if unsubscribed.guild_id.get() != self.managed_guild() {
            return;
        }
        self.orchestrator
            .handle(LifecycleSignal::Unsubscribed {
                event_id: EventId(unsubscribed.scheduled_event_id.get()),
                user_id: UserId(unsubscribed.user_id.get()),
            })
            .await;
    }

    async fn guild_member_addition(&self, _ctx: Context, member: Member) {
        if member.guild_id.get() != self.managed_guild() {
            return;
        }
        let user_id = UserId(member.user.id.get());
        if let Err(e) = self.orchestrator.greet_member(user_id).await {
            warn!(%user_id, error = %e, "Failed to greet new member");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                commands::handle(&ctx, &command, &self.orchestrator).await;
            }
            Interaction::Component(component) => {
                self.handle_component(&ctx, &component).await;
            }
            _ => {}
        }
    }
}
