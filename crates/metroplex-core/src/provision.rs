//! Artifact provisioning.
//!
//! Given a newly observed event, creates the announcement, the discussion
//! thread and the interest role, back-fills role membership, and registers
//! the artifact set in the record store. Idempotent: a second call for a
//! recorded event is a no-op, which makes retried "updated" signals safe.

use crate::config::MetroplexConfig;
use crate::error::{Error, Result};
use crate::event::EventSnapshot;
use crate::ids::{EventId, RoleId};
use crate::platform::Platform;
use crate::store::{EventArtifacts, RecordStore};
use crate::tags::Tag;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Per-event completion signal bridging provisioning and racing handlers.
///
/// A subscription signal can arrive while the provisioning task for the same
/// event is still creating the role. Handlers wait on the gate with a bound
/// instead of polling; the provisioner opens the gate right after the record
/// is persisted.
#[derive(Default)]
pub struct ReadyGates {
    inner: DashMap<EventId, Arc<Notify>>,
}

impl ReadyGates {
    /// Wait until the event is recorded, up to `wait`.
    ///
    /// Returns `Ok(None)` when the bound elapses without a record appearing.
    pub async fn wait_ready(
        &self,
        store: &dyn RecordStore,
        event_id: EventId,
        wait: Duration,
    ) -> Result<Option<EventArtifacts>> {
        if let Some(artifacts) = store.lookup(event_id).await? {
            return Ok(Some(artifacts));
        }
        let notify = self
            .inner
            .entry(event_id)
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone();
        let notified = notify.notified();
        // Re-check after registering: the gate may have opened in between.
        if let Some(artifacts) = store.lookup(event_id).await? {
            return Ok(Some(artifacts));
        }
        match tokio::time::timeout(wait, notified).await {
            Ok(()) => store.lookup(event_id).await,
            Err(_) => Ok(None),
        }
    }

    /// Open the gate for an event, waking every waiting handler.
    pub fn open(&self, event_id: EventId) {
        if let Some((_, notify)) = self.inner.remove(&event_id) {
            notify.notify_waiters();
        }
    }
}

/// Creates the derived artifacts of a newly observed event
pub struct Provisioner {
    platform: Arc<dyn Platform>,
    store: Arc<dyn RecordStore>,
    config: Arc<MetroplexConfig>,
    gates: Arc<ReadyGates>,
}

impl Provisioner {
    /// Create a provisioner.
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn RecordStore>,
        config: Arc<MetroplexConfig>,
        gates: Arc<ReadyGates>,
    ) -> Self {
        Self {
            platform,
            store,
            config,
            gates,
        }
    }

    /// Provision the artifact cluster for an event.
    ///
    /// Returns `Ok(None)` when the event is already recorded. An event name
    /// without a routing tag is reported to the operator and aborts before
    /// any artifact is created; a later rename re-triggers provisioning via
    /// the update signal.
    pub async fn provision(&self, event: &EventSnapshot) -> Result<Option<EventArtifacts>> {
        if self.store.lookup(event.id).await?.is_some() {
            info!(event_id = %event.id, "Event already provisioned, skipping");
            return Ok(None);
        }

        let tag = match Tag::extract(&event.name) {
            Some(tag) => tag,
            None => {
                let notice = format!(
                    "I could not find a routing tag in the event name \"{}\". \
                     Ask the organizer to add one (e.g. [ATX]) so I can announce it.",
                    event.name
                );
                let _ = self.platform.send_dm(self.config.operator_id, &notice).await;
                return Err(Error::Unclassified {
                    name: event.name.clone(),
                });
            }
        };
        let audience = self.config.audience_role(tag)?;

        let colour = match self.platform.role_colour(audience).await {
            Ok(colour) => colour,
            Err(e) => {
                warn!(role = %audience, error = %e, "Could not read audience role colour");
                0
            }
        };

        let message_id = self
            .platform
            .send_message(
                self.config.announcement_channel_id,
                &announcement_text(event, audience),
            )
            .await?;
        let thread_id = self
            .platform
            .create_thread(self.config.announcement_channel_id, message_id, &event.name)
            .await?;
        let role_id = self.platform.create_role(&event.name, colour).await?;

        // The event may predate the bot: grant the role to everyone the
        // platform already recorded as interested.
        match self.platform.event_subscribers(event.id).await {
            Ok(subscribers) => {
                for user in subscribers {
                    if let Err(e) = self.platform.grant_role(user, role_id).await {
                        warn!(event_id = %event.id, %user, error = %e,
                            "Could not back-fill interest role");
                    }
                }
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Could not fetch event subscribers");
            }
        }

        self.platform
            .send_message(thread_id, &onboarding_text(event, role_id))
            .await?;

        let artifacts = EventArtifacts {
            thread_id,
            message_id,
            role_id,
        };
        self.store.put(event.id, artifacts).await?;
        self.gates.open(event.id);
        info!(event_id = %event.id, name = %event.name, %role_id, "Provisioned event");
        Ok(Some(artifacts))
    }
}

/// Announcement content, also rebuilt in place on renames.
pub(crate) fn announcement_text(event: &EventSnapshot, audience: RoleId) -> String {
    format!(
        "{} a new event has been scheduled: **{}**\n{}",
        audience.mention(),
        event.name,
        event.link()
    )
}

fn onboarding_text(event: &EventSnapshot, role: RoleId) -> String {
    format!(
        "This thread belongs to **{}**, hosted by {}.\n\
         Ping {} to reach everyone interested.\n\
         The host can run `/collect_rsvps` here to start collecting RSVPs.",
        event.name,
        event.creator_id.mention(),
        role.mention()
    )
}
