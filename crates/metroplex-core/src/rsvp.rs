//! RSVP aggregation.
//!
//! One shared summary message per event renders the three-category status
//! board; every subscriber gets a private prompt whose buttons mutate that
//! same board. The board is structured state rendered to display text at the
//! boundary only; rendered text is never parsed back.

use crate::error::{Error, Result};
use crate::event::EventSnapshot;
use crate::ids::{ChannelId, EventId, MessageId, UserId};
use crate::platform::Platform;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Placeholder glyph rendered for an empty category.
pub const EMPTY_CATEGORY: &str = "* *";

/// The three mutually exclusive RSVP answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RsvpCategory {
    /// Attending
    Going,
    /// Undecided
    Maybe,
    /// Not attending
    NotGoing,
}

impl RsvpCategory {
    /// All categories in display order.
    pub const ALL: [Self; 3] = [Self::Going, Self::Maybe, Self::NotGoing];

    /// Display label used for summary fields and buttons.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Going => "Going",
            Self::Maybe => "Maybe",
            Self::NotGoing => "Not Going",
        }
    }

    /// Stable key used in component custom ids.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Going => "going",
            Self::Maybe => "maybe",
            Self::NotGoing => "not_going",
        }
    }

    /// Parse a component custom-id key back into a category.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "going" => Some(Self::Going),
            "maybe" => Some(Self::Maybe),
            "not_going" => Some(Self::NotGoing),
            _ => None,
        }
    }

    /// Confirmation line shown on the subscriber's own prompt.
    #[must_use]
    pub fn confirmation(self) -> &'static str {
        match self {
            Self::Going => "You have RSVPed that you are **going**.",
            Self::Maybe => "You have RSVPed that you are **maybe going**.",
            Self::NotGoing => "You have RSVPed that you are **not going**.",
        }
    }

    /// One-line status notification sent to the event creator.
    #[must_use]
    pub fn creator_notice(self, subscriber: UserId, event_name: &str) -> String {
        match self {
            Self::Going => format!("{} is going to {}!", subscriber.mention(), event_name),
            Self::Maybe => format!("{} might be going to {}.", subscriber.mention(), event_name),
            Self::NotGoing => {
                format!("{} is not going to {} :(", subscriber.mention(), event_name)
            }
        }
    }
}

/// Structured three-category status board.
///
/// A subscriber appears in at most one category; `answer` first strips the
/// subscriber from every category, then appends to exactly one, which makes
/// duplicate answers idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RsvpBoard {
    going: Vec<UserId>,
    maybe: Vec<UserId>,
    not_going: Vec<UserId>,
}

impl RsvpBoard {
    /// Move a subscriber into the chosen category.
    pub fn answer(&mut self, subscriber: UserId, category: RsvpCategory) {
        self.going.retain(|u| *u != subscriber);
        self.maybe.retain(|u| *u != subscriber);
        self.not_going.retain(|u| *u != subscriber);
        self.entries_mut(category).push(subscriber);
    }

    /// The category a subscriber currently occupies, if any.
    #[must_use]
    pub fn category_of(&self, subscriber: UserId) -> Option<RsvpCategory> {
        RsvpCategory::ALL
            .into_iter()
            .find(|c| self.entries(*c).contains(&subscriber))
    }

    /// Subscribers in a category, in answer order.
    #[must_use]
    pub fn entries(&self, category: RsvpCategory) -> &[UserId] {
        match category {
            RsvpCategory::Going => &self.going,
            RsvpCategory::Maybe => &self.maybe,
            RsvpCategory::NotGoing => &self.not_going,
        }
    }

    fn entries_mut(&mut self, category: RsvpCategory) -> &mut Vec<UserId> {
        match category {
            RsvpCategory::Going => &mut self.going,
            RsvpCategory::Maybe => &mut self.maybe,
            RsvpCategory::NotGoing => &mut self.not_going,
        }
    }

    /// Render one category: placeholder when empty, otherwise the mentions
    /// concatenated with no separator.
    #[must_use]
    pub fn render_category(&self, category: RsvpCategory) -> String {
        let entries = self.entries(category);
        if entries.is_empty() {
            EMPTY_CATEGORY.to_string()
        } else {
            entries.iter().map(|u| u.mention()).collect()
        }
    }
}

/// Everything the adapter needs to render one prompt message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsvpPrompt {
    /// Event the prompt belongs to
    pub event_id: EventId,
    /// Event display name
    pub event_name: String,
    /// Event description shown in the prompt body
    pub description: Option<String>,
    /// Currently selected answer (its affordance is disabled)
    pub selected: Option<RsvpCategory>,
}

impl RsvpPrompt {
    fn new(event_id: EventId, event_name: &str, description: Option<&str>) -> Self {
        Self {
            event_id,
            event_name: event_name.to_string(),
            description: description.map(str::to_string),
            selected: None,
        }
    }

    /// Prompt title line.
    #[must_use]
    pub fn title(&self) -> String {
        format!("RSVP to the event: {}", self.event_name)
    }
}

struct RsvpSession {
    event_name: String,
    description: Option<String>,
    creator: UserId,
    summary_channel: ChannelId,
    summary_message: MessageId,
    board: RsvpBoard,
    prompts: HashMap<UserId, (ChannelId, MessageId)>,
}

impl RsvpSession {
    fn prompt_for(&self, event_id: EventId, subscriber: UserId) -> RsvpPrompt {
        let mut prompt = RsvpPrompt::new(event_id, &self.event_name, self.description.as_deref());
        prompt.selected = self.board.category_of(subscriber);
        prompt
    }
}

/// Per-event RSVP collection state.
///
/// Purely in-memory: a restart discards prompt tracking, and cleanup after a
/// restart simply finds nothing to delete. The record store stays the only
/// durable truth.
pub struct RsvpCollector {
    platform: Arc<dyn Platform>,
    sessions: Mutex<HashMap<EventId, RsvpSession>>,
}

impl RsvpCollector {
    /// Create a collector on top of a platform handle.
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Whether collection has started for an event.
    pub async fn is_collecting(&self, event_id: EventId) -> bool {
        self.sessions.lock().await.contains_key(&event_id)
    }

    /// Start collection: create the shared summary in the creator's DM with
    /// the creator pre-seeded as Going, then fan a prompt out to every
    /// current subscriber except the creator.
    ///
    /// Fails with [`Error::AlreadyCollecting`] on a duplicate trigger. A
    /// rejected prompt delivery is reported to the creator by name and does
    /// not abort the remaining fan-out.
    pub async fn start(&self, event: &EventSnapshot, subscribers: &[UserId]) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&event.id) {
            return Err(Error::AlreadyCollecting);
        }

        let mut board = RsvpBoard::default();
        board.answer(event.creator_id, RsvpCategory::Going);

        let summary_channel = self.creator_dm(event.creator_id).await?;
        let summary_message = self
            .platform
            .send_rsvp_summary(summary_channel, &event.name, &board)
            .await?;

        let mut session = RsvpSession {
            event_name: event.name.clone(),
            description: event.description.clone(),
            creator: event.creator_id,
            summary_channel,
            summary_message,
            board,
            prompts: HashMap::new(),
        };

        for &subscriber in subscribers.iter().filter(|u| **u != event.creator_id) {
            let prompt = session.prompt_for(event.id, subscriber);
            match self.platform.send_rsvp_prompt(subscriber, &prompt).await {
                Ok(sent) => {
                    session.prompts.insert(subscriber, sent);
                }
                Err(e) => {
                    warn!(event_id = %event.id, user = %subscriber, error = %e,
                        "Could not deliver RSVP prompt");
                    let notice = format!(
                        "I could not send an RSVP prompt to {}.",
                        subscriber.mention()
                    );
                    let _ = self.platform.send_dm(event.creator_id, &notice).await;
                }
            }
        }

        info!(event_id = %event.id, prompts = session.prompts.len(), "Started RSVP collection");
        sessions.insert(event.id, session);
        Ok(())
    }

    /// Record an answer: mutate the board, re-render the shared summary,
    /// flip the prompt's affordances, and notify the creator unless the
    /// subscriber is the creator. Returns the confirmation line for the
    /// invoker.
    pub async fn answer(
        &self,
        event_id: EventId,
        subscriber: UserId,
        category: RsvpCategory,
    ) -> Result<&'static str> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&event_id).ok_or(Error::NotCollecting)?;

        session.board.answer(subscriber, category);
        self.platform
            .edit_rsvp_summary(
                session.summary_channel,
                session.summary_message,
                &session.event_name,
                &session.board,
            )
            .await?;

        if let Some(&(channel, message)) = session.prompts.get(&subscriber) {
            let prompt = session.prompt_for(event_id, subscriber);
            self.platform
                .update_rsvp_prompt(channel, message, &prompt, category.confirmation())
                .await?;
        }

        if subscriber != session.creator {
            let notice = category.creator_notice(subscriber, &session.event_name);
            if let Err(e) = self.platform.send_dm(session.creator, &notice).await {
                warn!(event_id = %event_id, error = %e, "Could not notify event creator");
            }
        }

        Ok(category.confirmation())
    }

    /// Send a prompt to a subscriber who joined after collection started.
    ///
    /// The new prompt mutates the same shared summary document.
    pub async fn late_join(&self, event_id: EventId, subscriber: UserId) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&event_id).ok_or(Error::NotCollecting)?;
        if subscriber == session.creator || session.prompts.contains_key(&subscriber) {
            return Ok(());
        }

        let prompt = session.prompt_for(event_id, subscriber);
        let sent = self.platform.send_rsvp_prompt(subscriber, &prompt).await?;
        session.prompts.insert(subscriber, sent);
        info!(event_id = %event_id, user = %subscriber, "Sent late-join RSVP prompt");
        Ok(())
    }

    /// Delete every tracked prompt and discard the tracking set.
    ///
    /// A no-op when collection never started. Missing prompt messages are
    /// tolerated.
    pub async fn cleanup(&self, event_id: EventId) -> Result<()> {
        let Some(session) = self.sessions.lock().await.remove(&event_id) else {
            return Ok(());
        };
        for (user, (channel, message)) in session.prompts {
            if let Err(e) = self.platform.delete_message(channel, message).await {
                warn!(event_id = %event_id, %user, error = %e, "Could not delete RSVP prompt");
            }
        }
        info!(event_id = %event_id, "Cleaned up RSVP collection");
        Ok(())
    }

    async fn creator_dm(&self, creator: UserId) -> Result<ChannelId> {
        self.platform.open_dm(creator).await
    }
}
