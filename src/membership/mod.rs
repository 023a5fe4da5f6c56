//! Membership View Module
//!
//! Tracks which peer addresses make up the cluster. The gossip engine samples
//! peers from the view, and views travel between replicas as part of each
//! round's topology exchange.
//!
//! ## Core Mechanisms
//! - **View capability**: `View` trait with the in-memory `ViewList` variant.
//! - **Epochs**: every local add/remove bumps the view epoch; a peer's list
//!   replaces ours when `(epoch, sorted list)` is greater, so edits made at
//!   the same epoch resolve to one list on every replica.
//! - **Empty lists**: an empty peer-supplied list never empties the view.

pub mod handlers;
pub mod types;
pub mod view;
