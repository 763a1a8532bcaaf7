//! Pending Gossip Table
//!
//! Tracks every value that has not yet been confirmed by all of its target peers.
//! Entries are added whenever a value is observed (locally or via gossip) and removed only
//! by the dissemination worker after a fan-out round in which every exchange succeeded.

use std::collections::HashMap;
use tokio::sync::{Mutex, Notify};

use super::types::{GossipRecord, Value};

pub struct PendingTable {
    /// Single critical section shared by push, acknowledge and snapshot.
    entries: Mutex<HashMap<Value, GossipRecord>>,
    /// Signalled on every push so an idle worker can resume.
    pushed: Notify,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            pushed: Notify::new(),
        }
    }

    /// Upserts `record` keyed by its value.
    ///
    /// An existing record is merged rather than replaced, so a shorter provenance list
    /// arriving later can never shrink `known_by`.
    pub async fn push(&self, record: GossipRecord) {
        {
            let mut entries = self.entries.lock().await;
            match entries.get_mut(&record.value) {
                Some(existing) => {
                    tracing::trace!(
                        "Merging provenance for pending value {} ({} -> +{})",
                        record.value,
                        existing.known_by.len(),
                        record.known_by.len()
                    );
                    existing.merge(record);
                }
                None => {
                    tracing::debug!("Queued value {} for gossip", record.value);
                    entries.insert(record.value, record);
                }
            }
        }

        self.pushed.notify_one();
    }

    /// Removes the entry for `value`. No-op if it is absent.
    pub async fn acknowledge(&self, value: Value) {
        if self.entries.lock().await.remove(&value).is_some() {
            tracing::debug!("Value {} acknowledged by all targets", value);
        }
    }

    /// Owned copy of all pending entries.
    pub async fn snapshot(&self) -> HashMap<Value, GossipRecord> {
        self.entries.lock().await.clone()
    }

    pub async fn get(&self, value: Value) -> Option<GossipRecord> {
        self.entries.lock().await.get(&value).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Resolves after the next `push` (or immediately if one happened since the last wait).
    pub async fn wait_for_push(&self) {
        self.pushed.notified().await;
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}
