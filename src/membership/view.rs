use rand::seq::SliceRandom;

use super::types::View;

/// In-memory membership view. Keeps members in insertion order and never
/// stores duplicates.
#[derive(Debug, Clone, Default)]
pub struct ViewList {
    primary: String,
    members: Vec<String>,
    epoch: u64,
}

impl ViewList {
    /// Builds a view from a comma separated member list. Blank items are
    /// skipped and `primary` is added if the list does not mention it.
    pub fn new(primary: &str, members: &str) -> Self {
        let mut view = Self {
            primary: primary.to_string(),
            members: Vec::new(),
            epoch: 0,
        };

        for addr in members.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            if !view.members.iter().any(|m| m == addr) {
                view.members.push(addr.to_string());
            }
        }
        if !primary.is_empty() && !view.members.iter().any(|m| m == primary) {
            view.members.push(primary.to_string());
        }

        view
    }
}

impl View for ViewList {
    fn count(&self) -> usize {
        self.members.len()
    }

    fn contains(&self, addr: &str) -> bool {
        self.members.iter().any(|m| m == addr)
    }

    fn add(&mut self, addr: &str) -> bool {
        if addr.is_empty() || self.contains(addr) {
            return false;
        }
        self.members.push(addr.to_string());
        self.epoch += 1;
        tracing::info!("View: added {} (epoch {})", addr, self.epoch);
        true
    }

    fn remove(&mut self, addr: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != addr);
        if self.members.len() == before {
            return false;
        }
        self.epoch += 1;
        tracing::info!("View: removed {} (epoch {})", addr, self.epoch);
        true
    }

    fn random(&self, n: usize) -> Vec<String> {
        let peers: Vec<&String> = self
            .members
            .iter()
            .filter(|m| **m != self.primary)
            .collect();

        peers
            .choose_multiple(&mut rand::thread_rng(), n)
            .map(|m| (*m).clone())
            .collect()
    }

    fn primary(&self) -> &str {
        &self.primary
    }

    fn list(&self) -> Vec<String> {
        self.members.clone()
    }

    fn overwrite(&mut self, members: Vec<String>) {
        let mut fresh: Vec<String> = Vec::with_capacity(members.len());
        for addr in members {
            if !addr.is_empty() && !fresh.contains(&addr) {
                fresh.push(addr);
            }
        }
        self.members = fresh;
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }

    fn set_epoch(&mut self, epoch: u64) {
        self.epoch = epoch;
    }
}
