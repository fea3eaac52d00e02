//! Teardown of completed or deleted events.
//!
//! Best-effort: every step checks current existence before acting, so any
//! step may be retried after a partial failure. The record is removed last,
//! which keeps a crashed teardown visible to the next reconciliation pass.

use crate::error::{Error, Result};
use crate::ids::EventId;
use crate::platform::Platform;
use crate::rsvp::RsvpCollector;
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Deletes the derived artifacts of an event and forgets the record
pub struct TeardownCoordinator {
    platform: Arc<dyn Platform>,
    store: Arc<dyn RecordStore>,
    rsvp: Arc<RsvpCollector>,
}

impl TeardownCoordinator {
    /// Create a teardown coordinator.
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn RecordStore>,
        rsvp: Arc<RsvpCollector>,
    ) -> Self {
        Self {
            platform,
            store,
            rsvp,
        }
    }

    /// Tear down one event: delete the interest role, clean up RSVP
    /// prompts, then remove the record. Already-gone artifacts are
    /// tolerated; an unrecorded event is a no-op.
    pub async fn teardown(&self, event_id: EventId) -> Result<()> {
        let Some(artifacts) = self.store.lookup(event_id).await? else {
            return Ok(());
        };

        match self.platform.delete_role(artifacts.role_id).await {
            Ok(()) => {}
            Err(Error::MissingArtifact { .. }) => {
                info!(%event_id, role = %artifacts.role_id, "Interest role already gone");
            }
            Err(e) => {
                warn!(%event_id, role = %artifacts.role_id, error = %e,
                    "Could not delete interest role");
            }
        }

        if let Err(e) = self.rsvp.cleanup(event_id).await {
            warn!(%event_id, error = %e, "RSVP cleanup failed");
        }

        self.store.remove(event_id).await?;
        info!(%event_id, "Tore down event");
        Ok(())
    }
}
