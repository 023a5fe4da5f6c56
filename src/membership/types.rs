use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Capabilities of a membership view: the set of peer addresses this replica
/// knows about.
///
/// The `epoch` is a logical clock over view changes. Local edits bump it and
/// gossip adopts a peer's list when `(epoch, sorted members)` is greater than
/// ours, so two edits made at the same epoch settle on the same winner.
pub trait View: Send + Sync {
    fn count(&self) -> usize;

    fn contains(&self, addr: &str) -> bool;

    /// Adds `addr`; false if it was already present.
    fn add(&mut self, addr: &str) -> bool;

    /// Removes `addr`; false if it was not present.
    fn remove(&mut self, addr: &str) -> bool;

    /// Up to `n` distinct peers chosen at random, never including ourselves.
    fn random(&self, n: usize) -> Vec<String>;

    /// Our own address.
    fn primary(&self) -> &str;

    /// Members in insertion order.
    fn list(&self) -> Vec<String>;

    /// Members joined with commas.
    fn joined(&self) -> String {
        self.list().join(",")
    }

    /// Replaces the whole membership.
    fn overwrite(&mut self, members: Vec<String>);

    fn epoch(&self) -> u64;

    fn set_epoch(&mut self, epoch: u64);

    /// Takes a peer's `members` and `epoch` if they outrank ours. An empty
    /// list never wins. Returns whether the view changed.
    fn adopt(&mut self, members: &[String], epoch: u64) -> bool {
        let theirs = canonical(members);
        if theirs.is_empty() {
            return false;
        }
        let ours = canonical(&self.list());
        if (epoch, &theirs) <= (self.epoch(), &ours) {
            return false;
        }
        self.overwrite(members.to_vec());
        self.set_epoch(epoch);
        true
    }
}

/// Sorted, deduplicated, non-blank members: the form views are ranked in.
pub fn canonical(members: &[String]) -> Vec<String> {
    let mut sorted: Vec<String> = members.iter().filter(|m| !m.is_empty()).cloned().collect();
    sorted.sort();
    sorted.dedup();
    sorted
}

/// A view shared between the gossip engine and the HTTP adapter.
pub type SharedView = Arc<RwLock<dyn View>>;

pub const ENDPOINT_VIEW: &str = "/view";

/// Form body of `PUT /view` and `DELETE /view`.
#[derive(Debug, Deserialize)]
pub struct ViewForm {
    pub ip_port: String,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}
