use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

use super::ring::Ring;
use super::types::{ShardGlob, shard_name};
use crate::error::ShardError;

/// Assignment of servers to shards plus the consistent-hash ring over shards.
///
/// Every server belongs to exactly one shard. Servers are dealt round-robin in
/// sorted order, so `count_servers() % count_shards()` shards end up one member
/// larger than the rest.
#[derive(Debug, Clone)]
pub struct ShardList {
    shards: BTreeMap<String, Vec<String>>,
    joined: BTreeMap<String, String>,
    primary_shard: String,
    primary_ip: String,
    ring: Ring,
    size: usize,
    num_shards: usize,
    epoch: u64,
    topology_changed: bool,
}

fn deal(servers: &[String], num_shards: usize) -> BTreeMap<String, Vec<String>> {
    let mut sorted: Vec<String> = servers.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut shards: BTreeMap<String, Vec<String>> =
        (0..num_shards).map(|i| (shard_name(i), Vec::new())).collect();
    for (i, server) in sorted.into_iter().enumerate() {
        if let Some(members) = shards.get_mut(&shard_name(i % num_shards)) {
            members.push(server);
        }
    }
    shards
}

impl ShardList {
    /// Deals `servers` round-robin over `num_shards` shards and builds the ring.
    pub fn new(primary_ip: &str, servers: &[String], num_shards: usize) -> Result<Self, ShardError> {
        if num_shards == 0 {
            return Err(ShardError::ZeroShards);
        }

        let mut list = Self {
            shards: BTreeMap::new(),
            joined: BTreeMap::new(),
            primary_shard: String::new(),
            primary_ip: primary_ip.to_string(),
            ring: Ring::new(),
            size: 0,
            num_shards: 0,
            epoch: 0,
            topology_changed: false,
        };
        list.install(deal(servers, num_shards));
        list.topology_changed = false;

        tracing::info!(
            "Shards: {} servers over {} shards, local shard {:?}",
            list.size,
            list.num_shards,
            list.primary_shard
        );
        Ok(list)
    }

    // Tears the ring down and rebuilds every derived field from `shards`.
    fn install(&mut self, shards: BTreeMap<String, Vec<String>>) {
        self.ring.clear();
        self.joined.clear();
        self.primary_shard.clear();

        for (id, members) in shards.iter() {
            self.ring.insert_shard(id);
            self.joined.insert(id.clone(), members.join(","));
            if members.iter().any(|m| *m == self.primary_ip) {
                self.primary_shard = id.clone();
            }
        }

        self.size = shards.values().map(Vec::len).sum();
        self.num_shards = shards.len();
        self.shards = shards;
        self.topology_changed = true;
    }

    pub fn count_shards(&self) -> usize {
        self.num_shards
    }

    pub fn count_servers(&self) -> usize {
        self.size
    }

    pub fn contains_shard(&self, shard_id: &str) -> bool {
        self.shards.contains_key(shard_id)
    }

    pub fn contains_server(&self, addr: &str) -> bool {
        self.shards.values().any(|members| members.iter().any(|m| m == addr))
    }

    /// Shard ids in sorted order.
    pub fn all_shards(&self) -> Vec<String> {
        self.shards.keys().cloned().collect()
    }

    /// Id of the shard the local server belongs to; empty if none.
    pub fn primary_id(&self) -> &str {
        &self.primary_shard
    }

    pub fn local_addr(&self) -> &str {
        &self.primary_ip
    }

    pub fn members(&self, shard_id: &str) -> &[String] {
        self.shards.get(shard_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Members of `shard_id` joined with commas.
    pub fn members_string(&self, shard_id: &str) -> &str {
        self.joined.get(shard_id).map(String::as_str).unwrap_or("")
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of shards holding one extra server after an uneven deal.
    pub fn leftover_servers(&self) -> usize {
        if self.num_shards == 0 {
            return 0;
        }
        self.size % self.num_shards
    }

    /// Servers per shard for an even deal, `None` when that would be below 2.
    pub fn servers_per_shard(&self) -> Option<usize> {
        if self.num_shards == 0 {
            return None;
        }
        let per_shard = self.size / self.num_shards;
        (per_shard >= 2).then_some(per_shard)
    }

    /// Shard owning `key` on the ring.
    pub fn owner_of(&self, key: &str) -> Option<&str> {
        self.ring.owner_of_key(key)
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    /// True if the topology changed since the last call. Consumers use this
    /// to re-partition the keys they own.
    pub fn take_topology_changed(&mut self) -> bool {
        std::mem::take(&mut self.topology_changed)
    }

    pub fn topology_changed(&self) -> bool {
        self.topology_changed
    }

    /// Adds an empty shard and its ring positions.
    pub fn add(&mut self, shard_id: &str) -> bool {
        if shard_id.is_empty() || self.shards.contains_key(shard_id) {
            return false;
        }

        self.shards.insert(shard_id.to_string(), Vec::new());
        self.joined.insert(shard_id.to_string(), String::new());
        self.ring.insert_shard(shard_id);
        self.num_shards += 1;
        self.epoch += 1;
        self.topology_changed = true;

        tracing::info!("Shard {} added ({} shards)", shard_id, self.num_shards);
        true
    }

    /// Drops a shard, its members and its ring positions.
    pub fn remove(&mut self, shard_id: &str) -> bool {
        let Some(members) = self.shards.remove(shard_id) else {
            return false;
        };

        self.joined.remove(shard_id);
        self.ring.remove_shard(shard_id);
        self.size -= members.len();
        self.num_shards -= 1;
        if self.primary_shard == shard_id {
            self.primary_shard.clear();
        }
        self.epoch += 1;
        self.topology_changed = true;

        tracing::info!("Shard {} removed ({} shards)", shard_id, self.num_shards);
        true
    }

    /// Places a new server in the smallest shard.
    pub fn add_server(&mut self, addr: &str) -> bool {
        if addr.is_empty() || self.contains_server(addr) {
            return false;
        }
        let Some(target) = self
            .shards
            .iter()
            .min_by_key(|(_, members)| members.len())
            .map(|(id, _)| id.clone())
        else {
            return false;
        };

        let mut shards = self.shards.clone();
        if let Some(members) = shards.get_mut(&target) {
            members.push(addr.to_string());
        }
        self.install(shards);
        self.epoch += 1;

        tracing::info!("Server {} joined shard {}", addr, target);
        true
    }

    pub fn remove_server(&mut self, addr: &str) -> bool {
        if !self.contains_server(addr) {
            return false;
        }

        let mut shards = self.shards.clone();
        for members in shards.values_mut() {
            members.retain(|m| m != addr);
        }
        self.install(shards);
        self.epoch += 1;

        tracing::info!("Server {} left the shard map", addr);
        true
    }

    /// Replaces the topology with `glob` unless it is identical. Returns
    /// whether anything changed.
    pub fn overwrite(&mut self, glob: &ShardGlob) -> bool {
        if glob.shards == self.shards {
            return false;
        }

        self.install(glob.shards.clone());
        tracing::info!(
            "Shard map overwritten: {} servers over {} shards, local shard {:?}",
            self.size,
            self.num_shards,
            self.primary_shard
        );
        true
    }

    /// Adopts a peer's snapshot if `(epoch, shards)` is greater than ours.
    /// Equal epochs fall back to comparing the maps, so concurrent edits
    /// settle on one winner everywhere.
    pub fn adopt(&mut self, glob: &ShardGlob) -> bool {
        if (glob.epoch, &glob.shards) <= (self.epoch, &self.shards) {
            return false;
        }
        self.epoch = glob.epoch;
        self.overwrite(glob);
        true
    }

    pub fn shard_glob(&self) -> ShardGlob {
        ShardGlob {
            shards: self.shards.clone(),
            epoch: self.epoch,
        }
    }

    /// Re-deals every known server over `n` shards. Rejected, with no change,
    /// when some shard would get fewer than 2 servers.
    pub fn change_shard_number(&mut self, n: usize) -> Result<(), ShardError> {
        if n == 0 {
            return Err(ShardError::ZeroShards);
        }
        if self.size / n < 2 {
            return Err(ShardError::InsufficientServers {
                servers: self.size,
                shards: n,
            });
        }

        let servers: Vec<String> = self.shards.values().flatten().cloned().collect();
        let glob = ShardGlob {
            shards: deal(&servers, n),
            epoch: self.epoch + 1,
        };
        self.overwrite(&glob);
        self.epoch = glob.epoch;
        Ok(())
    }

    /// Up to `n` distinct members of our own shard, excluding ourselves.
    pub fn random_local(&self, n: usize) -> Vec<String> {
        let peers: Vec<&String> = self
            .members(&self.primary_shard)
            .iter()
            .filter(|m| **m != self.primary_ip)
            .collect();

        peers
            .choose_multiple(&mut rand::thread_rng(), n)
            .map(|m| (*m).clone())
            .collect()
    }

    /// Up to `n` distinct servers from across the cluster, excluding
    /// ourselves, drawing at most one per shard before repeating a shard.
    pub fn random_global(&self, n: usize) -> Vec<String> {
        let mut rng = rand::thread_rng();
        let mut pools: Vec<Vec<&String>> = self
            .shards
            .values()
            .map(|members| members.iter().filter(|m| **m != self.primary_ip).collect())
            .filter(|pool: &Vec<&String>| !pool.is_empty())
            .collect();
        pools.shuffle(&mut rng);
        for pool in pools.iter_mut() {
            pool.shuffle(&mut rng);
        }

        let mut picked = Vec::new();
        let mut round = 0;
        while picked.len() < n {
            let mut took_any = false;
            for pool in pools.iter() {
                if let Some(addr) = pool.get(round) {
                    picked.push((*addr).clone());
                    took_any = true;
                    if picked.len() >= n {
                        break;
                    }
                }
            }
            if !took_any {
                break;
            }
            round += 1;
        }
        picked
    }

    /// A random member of `shard_id`.
    pub fn find_member(&self, shard_id: &str) -> Option<String> {
        let members = self.members(shard_id);
        if members.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..members.len());
        Some(members[idx].clone())
    }
}
