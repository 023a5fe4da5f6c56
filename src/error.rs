//! Error types shared across the store, the shard ring and the gossip engine.

use thiserror::Error;

/// Validation failures raised at the local store boundary.
///
/// A rejected write never mutates the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The key is longer than the allowed maximum (in bytes).
    #[error("key is {len} bytes, limit is {max}")]
    KeyTooLong { len: usize, max: usize },

    /// The value is larger than the allowed maximum (in bytes).
    #[error("value is {len} bytes, limit is {max}")]
    ValueTooLarge { len: usize, max: usize },
}

/// Failures of shard topology operations. The ring is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShardError {
    /// Redistribution would leave fewer than two servers in some shard.
    #[error("{servers} servers cannot fill {shards} shards with at least 2 servers each")]
    InsufficientServers { servers: usize, shards: usize },

    /// A shard count of zero was requested.
    #[error("shard count must be at least 1")]
    ZeroShards,

    /// The named shard is not part of the current topology.
    #[error("unknown shard {0}")]
    UnknownShard(String),
}

/// Failures of a single gossip round. None of these are fatal: the round is
/// abandoned and retried on the next tick.
#[derive(Debug, Error)]
pub enum GossipError {
    /// The peer could not be reached or the request failed in flight.
    #[error("peer {peer} unreachable: {reason}")]
    Transport { peer: String, reason: String },

    /// The peer answered with a non-success status.
    #[error("peer {peer} answered {status}")]
    Status { peer: String, status: u16 },

    /// The round did not finish before its deadline.
    #[error("round exceeded its deadline of {0:?}")]
    Deadline(std::time::Duration),
}
