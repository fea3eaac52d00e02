//! In-memory platform fake shared by the unit tests.

use crate::config::MetroplexConfig;
use crate::error::{Error, Result};
use crate::event::{EventSnapshot, EventStatus};
use crate::ids::{ChannelId, EventId, GuildId, MessageId, RoleId, UserId};
use crate::platform::Platform;
use crate::rsvp::{RsvpBoard, RsvpCategory, RsvpPrompt};
use crate::tags::Tag;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Config used across the unit tests.
pub(crate) fn test_config() -> MetroplexConfig {
    MetroplexConfig {
        guild_id: GuildId(42),
        announcement_channel_id: ChannelId(1),
        operator_id: UserId(900),
        audience_roles: [
            (Tag::Dtx, RoleId(203)),
            (Tag::Htx, RoleId(204)),
            (Tag::Atx, RoleId(201)),
            (Tag::Satx, RoleId(202)),
        ]
        .into_iter()
        .collect(),
        record_store_path: "events.json".into(),
        reconcile_interval_secs: 300,
        greet_channel_id: Some(ChannelId(2)),
    }
}

/// Scheduled-event snapshot in the test guild.
pub(crate) fn snapshot(id: u64, name: &str, creator: UserId) -> EventSnapshot {
    EventSnapshot {
        id: EventId(id),
        guild_id: GuildId(42),
        name: name.to_string(),
        description: Some("testdesc".to_string()),
        creator_id: creator,
        status: EventStatus::Scheduled,
    }
}

struct RoleState {
    name: String,
    colour: u32,
}

/// Rendered summary fields captured from the fake.
#[derive(Debug, Clone)]
pub(crate) struct SummaryView {
    pub going: String,
    pub maybe: String,
    pub not_going: String,
}

#[derive(Default)]
struct State {
    next_id: u64,
    messages: HashMap<MessageId, (ChannelId, String)>,
    deleted_messages: usize,
    threads: HashMap<ChannelId, String>,
    roles: HashMap<RoleId, RoleState>,
    grants: HashSet<(UserId, RoleId)>,
    events: HashMap<EventId, EventSnapshot>,
    subscribers: HashMap<EventId, Vec<UserId>>,
    dms: Vec<(UserId, String)>,
    fail_dm: HashSet<UserId>,
    summaries: Vec<SummaryView>,
    prompts_sent: Vec<(UserId, RsvpPrompt)>,
    prompt_updates: Vec<RsvpPrompt>,
}

impl State {
    fn fresh(&mut self) -> u64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

/// Recording in-memory stand-in for the chat platform
pub(crate) struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
        })
    }

    pub fn set_event(&self, event: EventSnapshot) {
        self.state.lock().unwrap().events.insert(event.id, event);
    }

    pub fn remove_event(&self, event_id: EventId) {
        self.state.lock().unwrap().events.remove(&event_id);
    }

    pub fn set_subscribers(&self, event_id: EventId, users: Vec<UserId>) {
        self.state.lock().unwrap().subscribers.insert(event_id, users);
    }

    pub fn seed_role(&self, name: &str) -> RoleId {
        let mut state = self.state.lock().unwrap();
        let id = RoleId(state.fresh());
        state.roles.insert(
            id,
            RoleState {
                name: name.to_string(),
                colour: 0,
            },
        );
        id
    }

    pub fn fail_dms_for(&self, user: UserId) {
        self.state.lock().unwrap().fail_dm.insert(user);
    }

    pub fn role_name(&self, role: RoleId) -> Option<String> {
        self.state.lock().unwrap().roles.get(&role).map(|r| r.name.clone())
    }

    pub fn role_exists(&self, role: RoleId) -> bool {
        self.state.lock().unwrap().roles.contains_key(&role)
    }

    pub fn role_count(&self) -> usize {
        self.state.lock().unwrap().roles.len()
    }

    pub fn has_role(&self, user: UserId, role: RoleId) -> bool {
        self.state.lock().unwrap().grants.contains(&(user, role))
    }

    pub fn message_content(&self, message: MessageId) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .messages
            .get(&message)
            .map(|(_, content)| content.clone())
    }

    pub fn messages_in(&self, channel: ChannelId) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .messages
            .values()
            .filter(|(ch, _)| *ch == channel)
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn thread_name(&self, thread: ChannelId) -> Option<String> {
        self.state.lock().unwrap().threads.get(&thread).cloned()
    }

    pub fn dms_to(&self, user: UserId) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .dms
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn prompted_users(&self) -> Vec<UserId> {
        self.state
            .lock()
            .unwrap()
            .prompts_sent
            .iter()
            .map(|(u, _)| *u)
            .collect()
    }

    pub fn last_summary(&self) -> Option<SummaryView> {
        self.state.lock().unwrap().summaries.last().cloned()
    }

    pub fn last_prompt_update(&self) -> Option<RsvpPrompt> {
        self.state.lock().unwrap().prompt_updates.last().cloned()
    }

    pub fn deleted_message_count(&self) -> usize {
        self.state.lock().unwrap().deleted_messages
    }

    fn render(board: &RsvpBoard) -> SummaryView {
        SummaryView {
            going: board.render_category(RsvpCategory::Going),
            maybe: board.render_category(RsvpCategory::Maybe),
            not_going: board.render_category(RsvpCategory::NotGoing),
        }
    }
}

#[async_trait::async_trait]
impl Platform for FakePlatform {
    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<MessageId> {
        let mut state = self.state.lock().unwrap();
        let id = MessageId(state.fresh());
        state.messages.insert(id, (channel, text.to_string()));
        Ok(id)
    }

    async fn edit_message(&self, _channel: ChannelId, message: MessageId, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.messages.get_mut(&message) {
            Some((_, content)) => {
                *content = text.to_string();
                Ok(())
            }
            None => Err(Error::MissingArtifact { kind: "message" }),
        }
    }

    async fn delete_message(&self, _channel: ChannelId, message: MessageId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.messages.remove(&message).is_some() {
            state.deleted_messages += 1;
            Ok(())
        } else {
            Err(Error::MissingArtifact { kind: "message" })
        }
    }

    async fn create_thread(
        &self,
        _channel: ChannelId,
        _root: MessageId,
        name: &str,
    ) -> Result<ChannelId> {
        let mut state = self.state.lock().unwrap();
        let id = ChannelId(state.fresh());
        state.threads.insert(id, name.to_string());
        Ok(id)
    }

    async fn rename_thread(&self, thread: ChannelId, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.threads.get_mut(&thread) {
            Some(existing) => {
                *existing = name.to_string();
                Ok(())
            }
            None => Err(Error::MissingArtifact { kind: "thread" }),
        }
    }

    async fn create_role(&self, name: &str, colour: u32) -> Result<RoleId> {
        let mut state = self.state.lock().unwrap();
        let id = RoleId(state.fresh());
        state.roles.insert(
            id,
            RoleState {
                name: name.to_string(),
                colour,
            },
        );
        Ok(id)
    }

    async fn rename_role(&self, role: RoleId, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.roles.get_mut(&role) {
            Some(existing) => {
                existing.name = name.to_string();
                Ok(())
            }
            None => Err(Error::MissingArtifact { kind: "role" }),
        }
    }

    async fn delete_role(&self, role: RoleId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.roles.remove(&role).is_some() {
            Ok(())
        } else {
            Err(Error::MissingArtifact { kind: "role" })
        }
    }

    async fn grant_role(&self, user: UserId, role: RoleId) -> Result<()> {
        self.state.lock().unwrap().grants.insert((user, role));
        Ok(())
    }

    async fn revoke_role(&self, user: UserId, role: RoleId) -> Result<()> {
        self.state.lock().unwrap().grants.remove(&(user, role));
        Ok(())
    }

    async fn role_colour(&self, role: RoleId) -> Result<u32> {
        self.state
            .lock()
            .unwrap()
            .roles
            .get(&role)
            .map(|r| r.colour)
            .ok_or(Error::MissingArtifact { kind: "role" })
    }

    async fn live_events(&self) -> Result<Vec<EventSnapshot>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .events
            .values()
            .filter(|e| e.status.is_live())
            .cloned()
            .collect())
    }

    async fn fetch_event(&self, event: EventId) -> Result<Option<EventSnapshot>> {
        Ok(self.state.lock().unwrap().events.get(&event).cloned())
    }

    async fn event_subscribers(&self, event: EventId) -> Result<Vec<UserId>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscribers
            .get(&event)
            .cloned()
            .unwrap_or_default())
    }

    async fn open_dm(&self, user: UserId) -> Result<ChannelId> {
        Ok(ChannelId(9_000_000 + user.get()))
    }

    async fn send_dm(&self, user: UserId, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_dm.contains(&user) {
            return Err(Error::DeliveryFailed { user });
        }
        state.dms.push((user, text.to_string()));
        Ok(())
    }

    async fn send_rsvp_summary(
        &self,
        channel: ChannelId,
        event_name: &str,
        board: &RsvpBoard,
    ) -> Result<MessageId> {
        let mut state = self.state.lock().unwrap();
        let id = MessageId(state.fresh());
        state
            .messages
            .insert(id, (channel, format!("RSVP List: {event_name}")));
        state.summaries.push(Self::render(board));
        Ok(id)
    }

    async fn edit_rsvp_summary(
        &self,
        _channel: ChannelId,
        message: MessageId,
        _event_name: &str,
        board: &RsvpBoard,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.messages.contains_key(&message) {
            return Err(Error::MissingArtifact { kind: "message" });
        }
        state.summaries.push(Self::render(board));
        Ok(())
    }

    async fn send_rsvp_prompt(
        &self,
        user: UserId,
        prompt: &RsvpPrompt,
    ) -> Result<(ChannelId, MessageId)> {
        let mut state = self.state.lock().unwrap();
        if state.fail_dm.contains(&user) {
            return Err(Error::DeliveryFailed { user });
        }
        let channel = ChannelId(9_000_000 + user.get());
        let id = MessageId(state.fresh());
        state.messages.insert(id, (channel, prompt.title()));
        state.prompts_sent.push((user, prompt.clone()));
        Ok((channel, id))
    }

    async fn update_rsvp_prompt(
        &self,
        _channel: ChannelId,
        message: MessageId,
        prompt: &RsvpPrompt,
        note: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.messages.get_mut(&message) {
            Some((_, content)) => {
                *content = note.to_string();
                state.prompt_updates.push(prompt.clone());
                Ok(())
            }
            None => Err(Error::MissingArtifact { kind: "message" }),
        }
    }
}
