//! Gossip Network Protocol
//!
//! Endpoints and DTOs of the anti-entropy exchange between two replicas.
//!
//! One round is two request/response pairs initiated by "Alice" towards "Bob":
//! 1. `DigestRequest` carries Alice's time digest; Bob answers with his own
//!    digest plus the keys he wants from Alice (`wanted`).
//! 2. `EntriesRequest` carries Alice's entries for Bob's `wanted` keys and the
//!    keys Alice wants from Bob; Bob merges, and answers with his entries.
//!
//! Both messages piggyback a `Topology` snapshot (view + shard map) so
//! membership changes spread the same way data does.

use serde::{Deserialize, Serialize};

use crate::shard::types::ShardGlob;
use crate::storage::types::{EntryGlob, TimeGlob};

// --- API Endpoints ---

/// Digest exchange (first half of a round).
pub const ENDPOINT_GOSSIP_DIGEST: &str = "/gossip/digest";
/// Entry bundle exchange (second half of a round).
pub const ENDPOINT_GOSSIP_ENTRIES: &str = "/gossip/entries";
/// Metadata-only exchange with peers outside our shard.
pub const ENDPOINT_GOSSIP_TOPOLOGY: &str = "/gossip/topology";

// --- Data Transfer Objects ---

/// Membership and shard metadata piggybacked on gossip messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Members in insertion order.
    pub view: Vec<String>,
    /// Epoch of `view`. Ties are broken by the sorted member list.
    pub view_epoch: u64,
    /// Shard map, if the sender runs sharded.
    #[serde(default)]
    pub shards: Option<ShardGlob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestRequest {
    /// Address of the initiator.
    pub from: String,
    pub digest: TimeGlob,
    pub topology: Topology,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestResponse {
    /// Responder's full time digest.
    pub digest: TimeGlob,
    /// Keys of the initiator's digest the responder is missing or disagrees on.
    pub wanted: TimeGlob,
    pub topology: Topology,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntriesRequest {
    pub from: String,
    /// Initiator's entries for the keys the responder asked for.
    pub bundle: EntryGlob,
    /// Keys the initiator wants from the responder.
    pub wanted: TimeGlob,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntriesResponse {
    pub bundle: EntryGlob,
}
