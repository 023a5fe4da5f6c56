//! Versioned Local Storage Module
//!
//! The authoritative state of one replica: a memory-resident map of key to
//! versioned entry.
//!
//! ## Core Concepts
//! - **Entry**: value plus causal metadata (version, timestamp, vector clock, tombstone).
//! - **Tombstones**: deletes clear the value but keep the entry so the deletion
//!   can travel through anti-entropy and win against older live copies.
//! - **Digests**: `TimeGlob` (key -> last write time) and `EntryGlob`
//!   (key -> full entry) are the read-locked snapshots the gossip engine ships
//!   between peers.
//! - **Locking**: one reader/writer lock; reads share it, writes and merges hold
//!   it exclusively, and nothing holds it across a network call.

pub mod entry;
pub mod handlers;
pub mod kvs;
pub mod protocol;
pub mod types;

#[cfg(test)]
mod tests;
