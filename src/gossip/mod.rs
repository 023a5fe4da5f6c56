//! Gossip (Anti-Entropy) Module
//!
//! Periodic, leaderless reconciliation of replicas.
//!
//! ## Round Lifecycle
//! `Idle -> RoundStarted -> DigestsExchanged -> Pruned -> BundlesBuilt -> Merged -> Idle`.
//! A round that overruns its deadline drops straight back to `Idle` with the
//! staleness flag raised; the next tick simply starts over.
//!
//! ## Submodules
//! - **`engine`**: `GossipEngine`, the round driver and the responder side.
//! - **`round`**: explicit per-engine round state (start, deadline, staleness).
//! - **`client`**: `PeerClient` transport capability and its HTTP implementation.
//! - **`protocol`**: endpoints and wire DTOs.
//! - **`handlers`**: axum handlers serving the responder side.

pub mod client;
pub mod engine;
pub mod handlers;
pub mod protocol;
pub mod round;
