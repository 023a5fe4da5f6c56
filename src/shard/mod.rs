//! Shard Ring Module
//!
//! Partitions the cluster into shards and maps keys to the shard that owns
//! them with consistent hashing.
//!
//! ## Core Concepts
//! - **ShardList**: shard id -> member servers, plus which shard we are in.
//! - **Ring**: ordered map of hash positions to shard ids. Each shard owns
//!   `VIRTUAL_NODES` positions derived only from its id, so every replica builds
//!   the same ring and adding or removing one shard moves only that shard's keys.
//! - **Topology epoch**: local topology edits bump an epoch; gossip adopts a
//!   peer's `ShardGlob` when `(epoch, shard map)` is greater than ours.

pub mod handlers;
pub mod list;
pub mod protocol;
pub mod ring;
pub mod types;
