//! Replicated Key-Value Store Library
//!
//! An eventually consistent, memory-resident key-value store replicated across
//! a cluster of peers and partitioned into shards. The binary (`main.rs`)
//! wires these modules together behind an HTTP API.
//!
//! ## Architecture Modules
//! - **`storage`**: the local store. Versioned entries with vector clocks and
//!   tombstones behind a single reader/writer lock, plus the client-facing
//!   key-value handlers.
//! - **`gossip`**: the anti-entropy engine. Periodic digest/bundle exchanges
//!   with random peers, merged with vector-clock conflict resolution.
//! - **`shard`**: the consistent-hash shard ring mapping keys to shards and
//!   servers to shards.
//! - **`membership`**: the view of which peers exist.
//! - **`config`** / **`error`**: start-up configuration and error types.

pub mod config;
pub mod error;
pub mod gossip;
pub mod membership;
pub mod shard;
pub mod storage;
