use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::entry::{Entry, KeyEntry, VectorClock};
use super::types::*;
use crate::error::StoreError;

/// Operations a replica's local store offers to the client adapter and to the
/// gossip engine.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Replica identifier used as the writer for local puts and deletes.
    fn replica_id(&self) -> &str;

    /// `(alive, version)` for `key`; `(false, 0)` if it was never written.
    async fn contains(&self, key: &str) -> (bool, u64);

    /// The live value, or an empty string for absent and deleted keys.
    async fn get(&self, key: &str) -> String;

    async fn put(
        &self,
        key: &str,
        value: String,
        time: Timestamp,
        clock: &VectorClock,
    ) -> Result<PutOutcome, StoreError>;

    /// Tombstones `key`. Returns false when there is no live value to delete.
    async fn delete(&self, key: &str, time: Timestamp, clock: &VectorClock) -> bool;

    async fn get_clock(&self, key: &str) -> VectorClock;

    async fn get_timestamp(&self, key: &str) -> Timestamp;

    /// Replaces (or inserts) the stored entry for `key` unconditionally.
    async fn overwrite_entry(&self, key: &str, entry: Entry);

    /// Installs `incoming`, exactly as shipped, if it outranks the local
    /// entry. Comparison and write happen under one write lock. Returns
    /// whether the store changed.
    async fn merge_entry(&self, key: &str, incoming: Entry) -> bool;

    /// Whether `incoming` would win against the current local entry.
    async fn would_yield(&self, key: &str, incoming: &Entry) -> bool;

    /// Timestamp of every stored key, tombstones included.
    async fn get_time_glob(&self) -> TimeGlob;

    /// Full entries for the keys of `glob` that exist locally.
    async fn get_entry_glob(&self, glob: &TimeGlob) -> EntryGlob;
}

/// In-memory store guarded by a single reader/writer lock.
pub struct Kvs {
    replica_id: String,
    db: RwLock<HashMap<String, Entry>>,
}

impl Kvs {
    pub fn new(replica_id: impl Into<String>) -> Self {
        Self {
            replica_id: replica_id.into(),
            db: RwLock::new(HashMap::new()),
        }
    }

    /// Copy of the stored entry, tombstones included.
    pub async fn entry(&self, key: &str) -> Option<Entry> {
        self.db.read().await.get(key).cloned()
    }

    /// Number of stored keys, tombstones included.
    pub async fn len(&self) -> usize {
        self.db.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.db.read().await.is_empty()
    }
}

fn validate(key: &str, value: &str) -> Result<(), StoreError> {
    if key.len() > MAX_KEY_LEN {
        return Err(StoreError::KeyTooLong {
            len: key.len(),
            max: MAX_KEY_LEN,
        });
    }
    if value.len() > MAX_VALUE_LEN {
        return Err(StoreError::ValueTooLarge {
            len: value.len(),
            max: MAX_VALUE_LEN,
        });
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for Kvs {
    fn replica_id(&self) -> &str {
        &self.replica_id
    }

    async fn contains(&self, key: &str) -> (bool, u64) {
        let db = self.db.read().await;
        let entry = KeyEntry::from(db.get(key));
        (entry.alive(), entry.version())
    }

    async fn get(&self, key: &str) -> String {
        let db = self.db.read().await;
        KeyEntry::from(db.get(key)).value().to_string()
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        time: Timestamp,
        clock: &VectorClock,
    ) -> Result<PutOutcome, StoreError> {
        validate(key, &value)?;

        let mut db = self.db.write().await;
        match db.get_mut(key) {
            Some(entry) => {
                let outcome = if entry.alive() {
                    PutOutcome::Updated
                } else {
                    PutOutcome::Created
                };
                entry.update(&self.replica_id, time, clock, value);
                tracing::debug!("PUT {} -> version {}", key, entry.version);
                Ok(outcome)
            }
            None => {
                let entry = Entry::new(&self.replica_id, time, clock, value);
                tracing::debug!("PUT {} -> new entry", key);
                db.insert(key.to_string(), entry);
                Ok(PutOutcome::Created)
            }
        }
    }

    async fn delete(&self, key: &str, time: Timestamp, clock: &VectorClock) -> bool {
        let mut db = self.db.write().await;
        match db.get_mut(key) {
            Some(entry) if entry.alive() => {
                entry.delete(&self.replica_id, time, clock);
                tracing::debug!("DELETE {} -> tombstone version {}", key, entry.version);
                true
            }
            _ => false,
        }
    }

    async fn get_clock(&self, key: &str) -> VectorClock {
        let db = self.db.read().await;
        KeyEntry::from(db.get(key)).clock().clone()
    }

    async fn get_timestamp(&self, key: &str) -> Timestamp {
        let db = self.db.read().await;
        KeyEntry::from(db.get(key)).timestamp()
    }

    async fn overwrite_entry(&self, key: &str, entry: Entry) {
        self.db.write().await.insert(key.to_string(), entry);
    }

    async fn merge_entry(&self, key: &str, incoming: Entry) -> bool {
        let mut db = self.db.write().await;
        let local = KeyEntry::from(db.get(key));
        if !local.yields_to(&incoming) {
            return false;
        }

        // Stored as shipped; the next local write still dominates its clock.
        tracing::debug!(
            "Merged {} (version {} -> {}, tombstone={})",
            key,
            local.version(),
            incoming.version,
            incoming.tombstone
        );
        db.insert(key.to_string(), incoming);
        true
    }

    async fn would_yield(&self, key: &str, incoming: &Entry) -> bool {
        let db = self.db.read().await;
        KeyEntry::from(db.get(key)).yields_to(incoming)
    }

    async fn get_time_glob(&self) -> TimeGlob {
        let db = self.db.read().await;
        db.iter()
            .map(|(key, entry)| (key.clone(), entry.timestamp))
            .collect()
    }

    async fn get_entry_glob(&self, glob: &TimeGlob) -> EntryGlob {
        let db = self.db.read().await;
        glob.list
            .keys()
            .filter_map(|key| db.get(key).map(|entry| (key.clone(), entry.clone())))
            .collect()
    }
}
