//! Record store: durable mapping from event id to derived artifact ids.
//!
//! The store is the single source of truth consulted before every create or
//! teardown decision. Every mutation rewrites the whole table to disk before
//! returning, so a crash between two creations never loses the id of a
//! fully-created artifact.

use crate::error::Result;
use crate::ids::{ChannelId, EventId, MessageId, RoleId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// The derived artifacts of one managed event.
///
/// All three are created together by the provisioner; a record either holds
/// all of them or does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventArtifacts {
    /// Discussion thread rooted at the announcement
    pub thread_id: ChannelId,
    /// Announcement message in the announcement channel
    pub message_id: MessageId,
    /// Interest role granted to subscribers
    pub role_id: RoleId,
}

/// Durable event-id to artifacts mapping
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the artifacts of a recorded event.
    async fn lookup(&self, event_id: EventId) -> Result<Option<EventArtifacts>>;

    /// Record a newly provisioned event. Persists before returning.
    async fn put(&self, event_id: EventId, artifacts: EventArtifacts) -> Result<()>;

    /// Remove a recorded event. Unknown ids are a no-op, not an error.
    async fn remove(&self, event_id: EventId) -> Result<()>;

    /// Snapshot of all recorded event ids.
    async fn event_ids(&self) -> Result<Vec<EventId>>;

    /// Reverse lookup by discussion thread.
    async fn find_by_thread(&self, thread_id: ChannelId) -> Result<Option<EventId>>;
}

/// Write-through JSON file store.
///
/// The whole table lives in one JSON document keyed by numeric event id.
/// Writes go to a sibling temp file first and are renamed into place, so a
/// torn write can never corrupt the table.
pub struct JsonRecordStore {
    path: PathBuf,
    table: Mutex<HashMap<EventId, EventArtifacts>>,
}

impl JsonRecordStore {
    /// Open the store, loading the existing table if the file is present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), records = table.len(), "Opened record store");
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    fn persist(&self, table: &HashMap<EventId, EventArtifacts>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_vec_pretty(table)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for JsonRecordStore {
    async fn lookup(&self, event_id: EventId) -> Result<Option<EventArtifacts>> {
        Ok(self.table.lock().await.get(&event_id).copied())
    }

    async fn put(&self, event_id: EventId, artifacts: EventArtifacts) -> Result<()> {
        let mut table = self.table.lock().await;
        table.insert(event_id, artifacts);
        self.persist(&table)?;
        debug!(%event_id, "Recorded event artifacts");
        Ok(())
    }

    async fn remove(&self, event_id: EventId) -> Result<()> {
        let mut table = self.table.lock().await;
        if table.remove(&event_id).is_some() {
            self.persist(&table)?;
            debug!(%event_id, "Removed event record");
        }
        Ok(())
    }

    async fn event_ids(&self) -> Result<Vec<EventId>> {
        Ok(self.table.lock().await.keys().copied().collect())
    }

    async fn find_by_thread(&self, thread_id: ChannelId) -> Result<Option<EventId>> {
        Ok(self
            .table
            .lock()
            .await
            .iter()
            .find(|(_, artifacts)| artifacts.thread_id == thread_id)
            .map(|(id, _)| *id))
    }
}
