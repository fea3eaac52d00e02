//! Lifecycle reconciliation.
//!
//! Routes the closed set of platform lifecycle signals to handlers and runs
//! the periodic full reconciliation pass. Every handler consults the record
//! store before acting, never in-memory flags, so duplicate or reordered
//! delivery is harmless. A handler failure is reported to the operator and
//! never stops later signals from being processed.

use crate::config::MetroplexConfig;
use crate::error::{Error, Result};
use crate::event::{EventSnapshot, LifecycleSignal};
use crate::ids::{ChannelId, EventId, GuildId, MessageId, RoleId, UserId};
use crate::platform::Platform;
use crate::provision::{announcement_text, Provisioner, ReadyGates};
use crate::rsvp::{RsvpCategory, RsvpCollector};
use crate::store::{EventArtifacts, RecordStore};
use crate::tags::Tag;
use crate::teardown::TeardownCoordinator;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{error, info, warn};

/// Default bound on waiting for a racing provisioning call.
const PROVISION_WAIT: Duration = Duration::from_secs(10);

static EVENT_LINK_RE: OnceLock<Regex> = OnceLock::new();
static ROLE_MENTION_RE: OnceLock<Regex> = OnceLock::new();

/// Parse a platform event link out of free-form message text.
#[must_use]
pub fn parse_event_link(text: &str) -> Option<(GuildId, EventId)> {
    let re = EVENT_LINK_RE.get_or_init(|| {
        Regex::new(r"discord(?:app)?\.com/events/(\d+)/(\d+)").expect("event link regex is valid")
    });
    let cap = re.captures(text)?;
    Some((cap[1].parse().ok()?, cap[2].parse().ok()?))
}

/// Parse the first role mention out of free-form message text.
#[must_use]
pub fn parse_role_mention(text: &str) -> Option<RoleId> {
    let re = ROLE_MENTION_RE
        .get_or_init(|| Regex::new(r"<@&(\d+)>").expect("role mention regex is valid"));
    re.captures(text).and_then(|cap| cap[1].parse().ok())
}

/// The event-lifecycle orchestrator.
///
/// Owns the provisioner, the RSVP collector and the teardown coordinator,
/// and is the only entry point the platform adapter calls into.
pub struct Orchestrator {
    platform: Arc<dyn Platform>,
    store: Arc<dyn RecordStore>,
    config: Arc<MetroplexConfig>,
    gates: Arc<ReadyGates>,
    provisioner: Provisioner,
    rsvp: Arc<RsvpCollector>,
    teardown: TeardownCoordinator,
    provision_wait: Duration,
}

impl Orchestrator {
    /// Wire up the orchestrator over a platform handle and a record store.
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn RecordStore>,
        config: Arc<MetroplexConfig>,
    ) -> Self {
        let gates = Arc::new(ReadyGates::default());
        let rsvp = Arc::new(RsvpCollector::new(platform.clone()));
        let provisioner = Provisioner::new(
            platform.clone(),
            store.clone(),
            config.clone(),
            gates.clone(),
        );
        let teardown = TeardownCoordinator::new(platform.clone(), store.clone(), rsvp.clone());
        Self {
            platform,
            store,
            config,
            gates,
            provisioner,
            rsvp,
            teardown,
            provision_wait: PROVISION_WAIT,
        }
    }

    /// Override the bound on waiting for racing provisioning (used in tests).
    #[must_use]
    pub fn with_provision_wait(mut self, wait: Duration) -> Self {
        self.provision_wait = wait;
        self
    }

    /// The RSVP collector (the adapter routes button answers through it).
    #[must_use]
    pub fn rsvp(&self) -> &RsvpCollector {
        &self.rsvp
    }

    /// The orchestrator configuration.
    #[must_use]
    pub fn config(&self) -> &MetroplexConfig {
        &self.config
    }

    /// Handle one lifecycle signal.
    ///
    /// Failures are logged and reported to the operator; they never
    /// propagate, so one bad signal cannot stall the event loop.
    pub async fn handle(&self, signal: LifecycleSignal) {
        let event_id = signal.event_id();
        match self.dispatch(signal).await {
            Ok(()) => {}
            // Already reported to the operator by the provisioner.
            Err(Error::Unclassified { name }) => {
                warn!(%event_id, %name, "Event left unmanaged: no routing tag");
            }
            Err(Error::ProvisionTimeout) => {
                warn!(%event_id, "Gave up waiting for provisioning");
            }
            Err(e) => {
                error!(%event_id, error = %e, "Lifecycle signal handler failed");
                let notice = format!("Handling a lifecycle signal for event {event_id} failed: {e}");
                let _ = self.platform.send_dm(self.config.operator_id, &notice).await;
            }
        }
    }

    async fn dispatch(&self, signal: LifecycleSignal) -> Result<()> {
        match signal {
            LifecycleSignal::Created(snapshot) | LifecycleSignal::Updated(snapshot) => {
                self.on_event_upsert(&snapshot).await
            }
            LifecycleSignal::Subscribed { event_id, user_id } => {
                self.on_subscribed(event_id, user_id).await
            }
            LifecycleSignal::Unsubscribed { event_id, user_id } => {
                self.on_unsubscribed(event_id, user_id).await
            }
            LifecycleSignal::Removed { event_id } => self.teardown.teardown(event_id).await,
        }
    }

    /// Creation and update signals share one handler: an update for an event
    /// the store has never seen provisions it (covers missed creation
    /// signals), and a completed or cancelled status tears it down.
    async fn on_event_upsert(&self, snapshot: &EventSnapshot) -> Result<()> {
        if !snapshot.status.is_live() {
            return self.teardown.teardown(snapshot.id).await;
        }
        match self.store.lookup(snapshot.id).await? {
            None => self.provisioner.provision(snapshot).await.map(|_| ()),
            Some(artifacts) => self.sync_names(snapshot, artifacts).await,
        }
    }

    /// Push the current display name onto role, thread and announcement.
    /// The record's identifiers never change on rename.
    async fn sync_names(&self, snapshot: &EventSnapshot, artifacts: EventArtifacts) -> Result<()> {
        match self.platform.rename_role(artifacts.role_id, &snapshot.name).await {
            Ok(()) | Err(Error::MissingArtifact { .. }) => {}
            Err(e) => return Err(e),
        }
        match self.platform.rename_thread(artifacts.thread_id, &snapshot.name).await {
            Ok(()) | Err(Error::MissingArtifact { .. }) => {}
            Err(e) => return Err(e),
        }
        match Tag::extract(&snapshot.name) {
            Some(tag) => {
                let audience = self.config.audience_role(tag)?;
                match self
                    .platform
                    .edit_message(
                        self.config.announcement_channel_id,
                        artifacts.message_id,
                        &announcement_text(snapshot, audience),
                    )
                    .await
                {
                    Ok(()) | Err(Error::MissingArtifact { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            None => {
                warn!(event_id = %snapshot.id, name = %snapshot.name,
                    "Renamed event lost its routing tag, announcement left as-is");
            }
        }
        info!(event_id = %snapshot.id, name = %snapshot.name, "Synced event rename");
        Ok(())
    }

    /// A subscription may race the provisioning task that is still creating
    /// the role; wait on the readiness gate instead of failing outright.
    async fn on_subscribed(&self, event_id: EventId, user_id: UserId) -> Result<()> {
        let artifacts = self
            .gates
            .wait_ready(self.store.as_ref(), event_id, self.provision_wait)
            .await?
            .ok_or(Error::ProvisionTimeout)?;

        self.platform.grant_role(user_id, artifacts.role_id).await?;

        if let Some(snapshot) = self.platform.fetch_event(event_id).await? {
            if user_id != snapshot.creator_id {
                let mention = format!(
                    "{} is interested in **{}**!",
                    user_id.mention(),
                    snapshot.name
                );
                self.platform
                    .send_message(artifacts.thread_id, &mention)
                    .await?;
            }
        }

        if self.rsvp.is_collecting(event_id).await {
            self.rsvp.late_join(event_id, user_id).await?;
        }
        Ok(())
    }

    /// Revoke the interest role, but only for events the store knows;
    /// unmanaged events never had one.
    async fn on_unsubscribed(&self, event_id: EventId, user_id: UserId) -> Result<()> {
        if let Some(artifacts) = self.store.lookup(event_id).await? {
            self.platform.revoke_role(user_id, artifacts.role_id).await?;
        }
        Ok(())
    }

    /// Full reconciliation: tear down every recorded event the platform no
    /// longer lists as live. Covers signals missed while the process was
    /// offline. Returns the number of events torn down.
    pub async fn reconcile(&self) -> Result<usize> {
        let live: HashSet<EventId> = self
            .platform
            .live_events()
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();

        let mut removed = 0;
        for event_id in self.store.event_ids().await? {
            if live.contains(&event_id) {
                continue;
            }
            match self.teardown.teardown(event_id).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(%event_id, error = %e, "Reconciliation teardown failed");
                }
            }
        }
        if removed > 0 {
            info!(removed, "Reconciliation pass tore down stale events");
        }
        Ok(removed)
    }

    /// Greet a newly joined member, when a greeting channel is configured.
    pub async fn greet_member(&self, user_id: UserId) -> Result<()> {
        if let Some(channel) = self.config.greet_channel_id {
            let greeting = format!("Hi {}!", user_id.mention());
            self.platform.send_message(channel, &greeting).await?;
        }
        Ok(())
    }

    /// Start RSVP collection. Creator-only, valid only inside the event's
    /// discussion thread, and exactly once per event. Returns the
    /// confirmation shown to the invoker.
    pub async fn start_rsvp(&self, invoker: UserId, thread: ChannelId) -> Result<String> {
        let event_id = self
            .store
            .find_by_thread(thread)
            .await?
            .ok_or_else(|| {
                Error::Precondition(
                    "This command only works inside an event discussion thread.".to_string(),
                )
            })?;
        let snapshot = self
            .platform
            .fetch_event(event_id)
            .await?
            .ok_or(Error::MissingArtifact { kind: "event" })?;
        if invoker != snapshot.creator_id {
            return Err(Error::Precondition(
                "Only the event creator can start RSVP collection.".to_string(),
            ));
        }
        let subscribers = self.platform.event_subscribers(event_id).await?;
        self.rsvp.start(&snapshot, &subscribers).await?;
        Ok(format!("RSVP collection started for **{}**.", snapshot.name))
    }

    /// Record an RSVP button answer. Returns the confirmation line.
    pub async fn answer_rsvp(
        &self,
        event_id: EventId,
        user_id: UserId,
        category: RsvpCategory,
    ) -> Result<&'static str> {
        self.rsvp.answer(event_id, user_id, category).await
    }

    /// Adopt an already-existing announcement into management. Operator-only
    /// recovery path: the event link and the audience role mention are
    /// parsed out of the announcement's content, the thread comes from the
    /// message itself. Returns the confirmation shown to the invoker.
    pub async fn adopt(
        &self,
        invoker: UserId,
        content: &str,
        message_id: MessageId,
        thread_id: Option<ChannelId>,
    ) -> Result<String> {
        if invoker != self.config.operator_id {
            return Err(Error::Precondition(
                "Only the operator can adopt events.".to_string(),
            ));
        }
        let (guild_id, event_id) = parse_event_link(content).ok_or_else(|| {
            Error::Precondition("No event link found in that message.".to_string())
        })?;
        if guild_id != self.config.guild_id {
            return Err(Error::Precondition(
                "That event link points at a different guild.".to_string(),
            ));
        }
        let role_id = parse_role_mention(content).ok_or_else(|| {
            Error::Precondition("No role mention found in that message.".to_string())
        })?;
        let thread_id = thread_id.ok_or_else(|| {
            Error::Precondition("That message has no discussion thread.".to_string())
        })?;

        self.store
            .put(
                event_id,
                EventArtifacts {
                    thread_id,
                    message_id,
                    role_id,
                },
            )
            .await?;
        info!(%event_id, %thread_id, %role_id, "Adopted existing event");
        Ok(format!("Adopted event {event_id} into management."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonRecordStore;
    use crate::testutil::{snapshot, test_config, FakePlatform};
    use crate::event::EventStatus;
    use tempfile::TempDir;

    struct TestContext {
        platform: Arc<FakePlatform>,
        store: Arc<JsonRecordStore>,
        orchestrator: Orchestrator,
        _dir: TempDir,
    }

    fn create_test_context() -> TestContext {
        let dir = TempDir::new().unwrap();
        let platform = FakePlatform::new();
        let store = Arc::new(JsonRecordStore::open(dir.path().join("events.json")).unwrap());
        let orchestrator = Orchestrator::new(
            platform.clone(),
            store.clone(),
            Arc::new(test_config()),
        )
        .with_provision_wait(Duration::from_millis(20));
        TestContext {
            platform,
            store,
            orchestrator,
            _dir: dir,
        }
    }

    async fn provisioned(ctx: &TestContext, id: u64, name: &str, creator: UserId) -> EventArtifacts {
        let event = snapshot(id, name, creator);
        ctx.platform.set_event(event.clone());
        ctx.orchestrator
            .handle(LifecycleSignal::Created(event))
            .await;
        ctx.store.lookup(EventId(id)).await.unwrap().unwrap()
    }

    #[test]
    fn test_parse_event_link() {
        let text = "check out https://discord.com/events/42/555 tonight";
        assert_eq!(parse_event_link(text), Some((GuildId(42), EventId(555))));
        assert_eq!(
            parse_event_link("https://discordapp.com/events/1/2"),
            Some((GuildId(1), EventId(2)))
        );
        assert_eq!(parse_event_link("no link here"), None);
    }

    #[test]
    fn test_parse_role_mention() {
        assert_eq!(parse_role_mention("ping <@&201> folks"), Some(RoleId(201)));
        assert_eq!(parse_role_mention("plain <@100> user mention"), None);
    }

    #[tokio::test]
    async fn test_update_for_unknown_event_provisions() {
        let ctx = create_test_context();
        let event = snapshot(5, "[SATX] Taco Crawl", UserId(100));
        ctx.platform.set_event(event.clone());

        ctx.orchestrator
            .handle(LifecycleSignal::Updated(event))
            .await;

        assert!(ctx.store.lookup(EventId(5)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rename_updates_artifacts_in_place() {
        let ctx = create_test_context();
        let artifacts = provisioned(&ctx, 5, "[ATX] Game Night", UserId(100)).await;

        let renamed = snapshot(5, "[ATX] Game Night: Season Finale", UserId(100));
        ctx.platform.set_event(renamed.clone());
        ctx.orchestrator
            .handle(LifecycleSignal::Updated(renamed))
            .await;

        assert_eq!(
            ctx.platform.role_name(artifacts.role_id).unwrap(),
            "[ATX] Game Night: Season Finale"
        );
        assert_eq!(
            ctx.platform.thread_name(artifacts.thread_id).unwrap(),
            "[ATX] Game Night: Season Finale"
        );
        let announcement = ctx.platform.message_content(artifacts.message_id).unwrap();
        assert!(announcement.contains("Season Finale"));
        // Identifiers unchanged.
        assert_eq!(
            ctx.store.lookup(EventId(5)).await.unwrap(),
            Some(artifacts)
        );
    }

    #[tokio::test]
    async fn test_completed_status_tears_down() {
        let ctx = create_test_context();
        let artifacts = provisioned(&ctx, 5, "[ATX] Game Night", UserId(100)).await;

        let mut done = snapshot(5, "[ATX] Game Night", UserId(100));
        done.status = EventStatus::Completed;
        ctx.orchestrator.handle(LifecycleSignal::Updated(done)).await;

        assert!(ctx.store.lookup(EventId(5)).await.unwrap().is_none());
        assert!(!ctx.platform.role_exists(artifacts.role_id));
    }

    #[tokio::test]
    async fn test_removed_signal_tears_down() {
        let ctx = create_test_context();
        provisioned(&ctx, 5, "[ATX] Game Night", UserId(100)).await;

        ctx.orchestrator
            .handle(LifecycleSignal::Removed { event_id: EventId(5) })
            .await;
        assert!(ctx.store.lookup(EventId(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscribe_grants_role_and_mentions_in_thread() {
        let ctx = create_test_context();
        let artifacts = provisioned(&ctx, 5, "[ATX] Game Night", UserId(100)).await;

        ctx.orchestrator
            .handle(LifecycleSignal::Subscribed {
                event_id: EventId(5),
                user_id: UserId(101),
            })
            .await;

        assert!(ctx.platform.has_role(UserId(101), artifacts.role_id));
        let thread_messages = ctx.platform.messages_in(artifacts.thread_id);
        assert!(thread_messages.iter().any(|m| m.contains("<@101>")));
    }

    #[tokio::test]
    async fn test_creator_subscribe_suppresses_mention() {
        let ctx = create_test_context();
        let artifacts = provisioned(&ctx, 5, "[ATX] Game Night", UserId(100)).await;
        let before = ctx.platform.messages_in(artifacts.thread_id).len();

        ctx.orchestrator
            .handle(LifecycleSignal::Subscribed {
                event_id: EventId(5),
                user_id: UserId(100),
            })
            .await;

        assert!(ctx.platform.has_role(UserId(100), artifacts.role_id));
        assert_eq!(ctx.platform.messages_in(artifacts.thread_id).len(), before);
    }

    #[tokio::test]
    async fn test_subscribe_during_collection_sends_late_prompt() {
        let ctx = create_test_context();
        provisioned(&ctx, 5, "[ATX] Game Night", UserId(100)).await;
        ctx.orchestrator
            .start_rsvp(UserId(100), thread_of(&ctx).await)
            .await
            .unwrap();

        ctx.orchestrator
            .handle(LifecycleSignal::Subscribed {
                event_id: EventId(5),
                user_id: UserId(101),
            })
            .await;

        assert_eq!(ctx.platform.prompted_users(), vec![UserId(101)]);
    }

    async fn thread_of(ctx: &TestContext) -> ChannelId {
        ctx.store
            .lookup(EventId(5))
            .await
            .unwrap()
            .unwrap()
            .thread_id
    }

    #[tokio::test]
    async fn test_unsubscribe_checks_store_first() {
        let ctx = create_test_context();
        let artifacts = provisioned(&ctx, 5, "[ATX] Game Night", UserId(100)).await;
        ctx.platform.grant_role(UserId(101), artifacts.role_id).await.unwrap();

        // Unmanaged event: nothing to revoke, nothing reported.
        ctx.orchestrator
            .handle(LifecycleSignal::Unsubscribed {
                event_id: EventId(999),
                user_id: UserId(101),
            })
            .await;
        assert!(ctx.platform.dms_to(test_config().operator_id).is_empty());

        ctx.orchestrator
            .handle(LifecycleSignal::Unsubscribed {
                event_id: EventId(5),
                user_id: UserId(101),
            })
            .await;
        assert!(!ctx.platform.has_role(UserId(101), artifacts.role_id));
    }

    #[tokio::test]
    async fn test_reconcile_closes_gaps_exactly_once() {
        let ctx = create_test_context();
        let artifacts = provisioned(&ctx, 5, "[ATX] Game Night", UserId(100)).await;
        provisioned(&ctx, 6, "[SATX] Taco Crawl", UserId(100)).await;

        // Event 5 disappeared from the platform while we were offline.
        ctx.platform.remove_event(EventId(5));

        assert_eq!(ctx.orchestrator.reconcile().await.unwrap(), 1);
        assert!(ctx.store.lookup(EventId(5)).await.unwrap().is_none());
        assert!(ctx.store.lookup(EventId(6)).await.unwrap().is_some());
        assert!(!ctx.platform.role_exists(artifacts.role_id));

        // Second pass finds nothing left to do.
        assert_eq!(ctx.orchestrator.reconcile().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_start_rsvp_preconditions() {
        let ctx = create_test_context();
        provisioned(&ctx, 5, "[ATX] Game Night", UserId(100)).await;
        let thread = thread_of(&ctx).await;

        // Wrong channel.
        let err = ctx
            .orchestrator
            .start_rsvp(UserId(100), ChannelId(12345))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));

        // Wrong invoker.
        let err = ctx
            .orchestrator
            .start_rsvp(UserId(101), thread)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));

        // Creator succeeds once, duplicates rejected.
        ctx.orchestrator.start_rsvp(UserId(100), thread).await.unwrap();
        assert!(matches!(
            ctx.orchestrator.start_rsvp(UserId(100), thread).await,
            Err(Error::AlreadyCollecting)
        ));
    }

    #[tokio::test]
    async fn test_adopt_requires_operator_and_parses_message() {
        let ctx = create_test_context();
        let content = "<@&201> a new event has been scheduled: **[ATX] Game Night**\n\
                       https://discord.com/events/42/77";

        let err = ctx
            .orchestrator
            .adopt(UserId(100), content, MessageId(11), Some(ChannelId(12)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));

        let operator = test_config().operator_id;
        ctx.orchestrator
            .adopt(operator, content, MessageId(11), Some(ChannelId(12)))
            .await
            .unwrap();

        assert_eq!(
            ctx.store.lookup(EventId(77)).await.unwrap(),
            Some(EventArtifacts {
                thread_id: ChannelId(12),
                message_id: MessageId(11),
                role_id: RoleId(201),
            })
        );

        // Missing thread or foreign guild are precondition failures.
        assert!(matches!(
            ctx.orchestrator
                .adopt(operator, content, MessageId(11), None)
                .await,
            Err(Error::Precondition(_))
        ));
        let foreign = "<@&201> https://discord.com/events/43/77";
        assert!(matches!(
            ctx.orchestrator
                .adopt(operator, foreign, MessageId(11), Some(ChannelId(12)))
                .await,
            Err(Error::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_to_never_provisioned_event_times_out_quietly() {
        let ctx = create_test_context();
        ctx.orchestrator
            .handle(LifecycleSignal::Subscribed {
                event_id: EventId(404),
                user_id: UserId(101),
            })
            .await;
        // Bounded wait elapsed; no operator report for this case.
        assert!(ctx.platform.dms_to(test_config().operator_id).is_empty());
    }

    #[tokio::test]
    async fn test_greet_member() {
        let ctx = create_test_context();
        ctx.orchestrator.greet_member(UserId(7)).await.unwrap();
        let greetings = ctx.platform.messages_in(ChannelId(2));
        assert_eq!(greetings, vec!["Hi <@7>!".to_string()]);
    }
}
