use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::types::Timestamp;

/// Causal history of a key: replica address -> number of writes that replica
/// has made to the key (directly or as observed through merges).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock(BTreeMap<String, u64>);

static EMPTY_CLOCK: VectorClock = VectorClock(BTreeMap::new());

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter recorded for `replica`, zero if it never wrote.
    pub fn get(&self, replica: &str) -> u64 {
        self.0.get(replica).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.0.iter()
    }

    /// Component-wise maximum with `other`.
    pub fn merge(&mut self, other: &VectorClock) {
        for (replica, &counter) in other.0.iter() {
            let slot = self.0.entry(replica.clone()).or_insert(0);
            if counter > *slot {
                *slot = counter;
            }
        }
    }

    /// Total number of writes recorded across all replicas. A causally greater
    /// clock always has a strictly larger sum.
    pub fn sum(&self) -> u64 {
        self.0.values().sum()
    }

    /// Bumps the counter of `replica` by one and returns the new value.
    pub fn increment(&mut self, replica: &str) -> u64 {
        let slot = self.0.entry(replica.to_string()).or_insert(0);
        *slot += 1;
        *slot
    }
}

impl PartialOrd for VectorClock {
    /// `Less` means `self` happened before `other`. Concurrent clocks are
    /// unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let mut self_ahead = false;
        let mut other_ahead = false;

        for replica in self.0.keys().chain(other.0.keys()) {
            match self.get(replica).cmp(&other.get(replica)) {
                Ordering::Greater => self_ahead = true,
                Ordering::Less => other_ahead = true,
                Ordering::Equal => {}
            }
        }

        match (self_ahead, other_ahead) {
            (false, false) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (true, true) => None,
        }
    }
}

impl FromIterator<(String, u64)> for VectorClock {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, u64>> for VectorClock {
    fn from(map: BTreeMap<String, u64>) -> Self {
        Self(map)
    }
}

/// The stored unit for one key.
///
/// Deletions keep the entry around as a tombstone (value cleared) so that
/// anti-entropy can still compare it against live copies on other replicas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub value: String,
    pub version: u64,
    pub timestamp: Timestamp,
    pub clock: VectorClock,
    pub tombstone: bool,
}

impl Entry {
    /// First write of a key on `writer`. Version starts at 1.
    pub fn new(writer: &str, time: Timestamp, clock: &VectorClock, value: String) -> Self {
        let mut entry = Self {
            value,
            version: 0,
            timestamp: time,
            clock: VectorClock::new(),
            tombstone: false,
        };
        entry.stamp(writer, time, clock);
        entry
    }

    pub fn update(&mut self, writer: &str, time: Timestamp, clock: &VectorClock, value: String) {
        self.value = value;
        self.tombstone = false;
        self.stamp(writer, time, clock);
    }

    pub fn delete(&mut self, writer: &str, time: Timestamp, clock: &VectorClock) {
        self.value.clear();
        self.tombstone = true;
        self.stamp(writer, time, clock);
    }

    pub fn alive(&self) -> bool {
        !self.tombstone
    }

    /// Position of this entry in the merge order. Compared lexicographically:
    /// clock sum, then timestamp, version, tombstone over live, and value.
    pub fn rank(&self) -> (u64, Timestamp, u64, bool, &str) {
        (
            self.clock.sum(),
            self.timestamp,
            self.version,
            self.tombstone,
            self.value.as_str(),
        )
    }

    // Every local write lands causally after everything the writer has seen:
    // the clock absorbs the caller's clock and the writer's own slot moves past
    // both.
    fn stamp(&mut self, writer: &str, time: Timestamp, clock: &VectorClock) {
        self.timestamp = time;
        self.version += 1;
        self.clock.merge(clock);
        self.clock.increment(writer);
    }
}

/// Result of looking a key up in a store: either the stored entry or nothing.
///
/// All accessors are total, so callers never need an existence check before
/// reading metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEntry<'a> {
    Present(&'a Entry),
    Absent,
}

impl<'a> KeyEntry<'a> {
    pub fn version(&self) -> u64 {
        match self {
            KeyEntry::Present(entry) => entry.version,
            KeyEntry::Absent => 0,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            KeyEntry::Present(entry) => entry.timestamp,
            KeyEntry::Absent => 0,
        }
    }

    pub fn clock(&self) -> &'a VectorClock {
        match self {
            KeyEntry::Present(entry) => &entry.clock,
            KeyEntry::Absent => &EMPTY_CLOCK,
        }
    }

    /// The live value; empty for absent and tombstoned keys.
    pub fn value(&self) -> &'a str {
        match self {
            KeyEntry::Present(entry) if entry.alive() => &entry.value,
            _ => "",
        }
    }

    pub fn alive(&self) -> bool {
        matches!(self, KeyEntry::Present(entry) if entry.alive())
    }

    /// Whether `incoming` should replace this entry during a merge.
    ///
    /// Entries are totally ordered by `Entry::rank`, which extends causal
    /// order: a causally newer write always ranks higher. Only a strictly
    /// higher rank wins, so a replica's final entry is the maximum of every
    /// entry it has seen, whatever order they arrived in.
    pub fn yields_to(&self, incoming: &Entry) -> bool {
        match self {
            KeyEntry::Present(local) => incoming.rank() > local.rank(),
            KeyEntry::Absent => true,
        }
    }
}

impl<'a> From<Option<&'a Entry>> for KeyEntry<'a> {
    fn from(entry: Option<&'a Entry>) -> Self {
        match entry {
            Some(entry) => KeyEntry::Present(entry),
            None => KeyEntry::Absent,
        }
    }
}
