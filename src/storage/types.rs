use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entry::Entry;

/// Wall-clock milliseconds since the Unix epoch. Zero means "never written".
pub type Timestamp = u64;

/// Longest accepted key, in bytes.
pub const MAX_KEY_LEN: usize = 200;

/// Largest accepted value, in bytes (1 MiB).
pub const MAX_VALUE_LEN: usize = 1024 * 1024;

/// Whether a successful put created the key or replaced a live value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Updated,
}

/// Compact summary of a store: key -> timestamp of its last write.
///
/// Tombstoned keys are included so deletions take part in anti-entropy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeGlob {
    pub list: BTreeMap<String, Timestamp>,
}

impl TimeGlob {
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl FromIterator<(String, Timestamp)> for TimeGlob {
    fn from_iter<I: IntoIterator<Item = (String, Timestamp)>>(iter: I) -> Self {
        Self {
            list: iter.into_iter().collect(),
        }
    }
}

/// Full entries for a set of keys, shipped when digests disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryGlob {
    pub keys: BTreeMap<String, Entry>,
}

impl EntryGlob {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<(String, Entry)> for EntryGlob {
    fn from_iter<I: IntoIterator<Item = (String, Entry)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
