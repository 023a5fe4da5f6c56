use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::list::ShardList;

/// Snapshot of the whole shard topology as exchanged between replicas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardGlob {
    /// Shard id -> member addresses.
    pub shards: BTreeMap<String, Vec<String>>,
    /// Logical clock over topology changes. Higher wins; equal epochs compare
    /// `shards`.
    #[serde(default)]
    pub epoch: u64,
}

/// Shard list shared between the gossip engine and the HTTP adapter.
pub type SharedShards = Arc<RwLock<ShardList>>;

/// Deterministic name of the `index`-th shard: A, B, ..., Z, AA, AB, ...
pub fn shard_name(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
