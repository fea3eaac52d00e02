//! Slash-command surface.
//!
//! Two guild commands: `/collect_rsvps` inside an event discussion thread
//! and the operator-only `/adopt_event` for re-attaching records to events
//! provisioned before a restart.

use metroplex_core::{ChannelId, Error as CoreError, MessageId, Orchestrator, UserId};
use serenity::all::{
    CommandDataOptionValue, CommandInteraction, CommandOptionType, Context, CreateCommand,
    CreateCommandOption, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use tracing::error;

/// The guild command set registered on ready.
#[must_use]
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("collect_rsvps")
            .description("Send RSVP prompts to everyone interested in this event"),
        CreateCommand::new("adopt_event")
            .description("Re-attach an existing announcement to its scheduled event")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "message_id",
                    "Id of the announcement message in this channel",
                )
                .required(true),
            ),
    ]
}

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command.data.options.iter().find_map(|option| {
        if option.name != name {
            return None;
        }
        match &option.value {
            CommandDataOptionValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    })
}

/// Dispatch one command interaction and reply with the outcome.
pub async fn handle(ctx: &Context, command: &CommandInteraction, orchestrator: &Orchestrator) {
    let invoker = UserId(command.user.id.get());
    let outcome = match command.data.name.as_str() {
        "collect_rsvps" => {
            orchestrator
                .start_rsvp(invoker, ChannelId(command.channel_id.get()))
                .await
        }
        "adopt_event" => adopt_event(ctx, command, orchestrator, invoker).await,
        other => {
            error!(command = %other, "Received unregistered command");
            return;
        }
    };

    let reply = match outcome {
        Ok(text) => text,
        Err(CoreError::Precondition(text)) => text,
        Err(CoreError::AlreadyCollecting) => {
            "RSVP collection is already running for this event.".to_string()
        }
        Err(e) => {
            error!(command = %command.data.name, %invoker, error = %e, "Command failed");
            "Something went wrong, please try again.".to_string()
        }
    };

    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(reply)
            .ephemeral(true),
    );
    if let Err(e) = command.create_response(&ctx.http, response).await {
        error!(command = %command.data.name, error = %e, "Failed to respond to command");
    }
}

async fn adopt_event(
    ctx: &Context,
    command: &CommandInteraction,
    orchestrator: &Orchestrator,
    invoker: UserId,
) -> metroplex_core::Result<String> {
    let raw_id = string_option(command, "message_id").ok_or_else(|| {
        CoreError::Precondition("The message_id option is required.".to_string())
    })?;
    let message_id: MessageId = raw_id.parse().map_err(|_| {
        CoreError::Precondition(format!("`{raw_id}` is not a valid message id."))
    })?;

    let message = command
        .channel_id
        .message(&ctx.http, serenity::all::MessageId::new(message_id.get()))
        .await
        .map_err(|_| {
            CoreError::Precondition("I could not find that message in this channel.".to_string())
        })?;

    let thread_id = message.thread.as_ref().map(|t| ChannelId(t.id.get()));
    orchestrator
        .adopt(invoker, &message.content, message_id, thread_id)
        .await
}
