use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Ring positions owned by every shard.
pub const VIRTUAL_NODES: usize = 64;

/// Stable 64-bit ring hash. Every replica must compute identical positions,
/// so this avoids the per-process seeded std hasher.
pub fn ring_hash(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Ring positions of a shard, a pure function of its id.
pub fn virtual_node_positions(shard_id: &str) -> Vec<u64> {
    (0..VIRTUAL_NODES)
        .map(|replica| ring_hash(format!("{}#{}", shard_id, replica).as_bytes()))
        .collect()
}

/// Consistent-hash ring: ordered map of position -> shard id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ring {
    positions: BTreeMap<u64, String>,
}

impl Ring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, position: u64, shard_id: &str) {
        self.positions.insert(position, shard_id.to_string());
    }

    pub fn delete(&mut self, position: u64) -> Option<String> {
        self.positions.remove(&position)
    }

    /// Inserts all virtual positions of `shard_id`.
    pub fn insert_shard(&mut self, shard_id: &str) {
        for position in virtual_node_positions(shard_id) {
            self.put(position, shard_id);
        }
    }

    /// Removes the positions of `shard_id`, leaving any position another shard
    /// happens to hold.
    pub fn remove_shard(&mut self, shard_id: &str) {
        for position in virtual_node_positions(shard_id) {
            if self.positions.get(&position).is_some_and(|s| s == shard_id) {
                self.positions.remove(&position);
            }
        }
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Shard at the first position >= `hash`, wrapping to the lowest position.
    pub fn owner(&self, hash: u64) -> Option<&str> {
        self.positions
            .range(hash..)
            .next()
            .or_else(|| self.positions.iter().next())
            .map(|(_, shard)| shard.as_str())
    }

    pub fn owner_of_key(&self, key: &str) -> Option<&str> {
        self.owner(ring_hash(key.as_bytes()))
    }
}
