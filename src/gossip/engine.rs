//! Anti-Entropy Engine
//!
//! Runs leaderless reconciliation rounds between replicas:
//! select peer -> exchange digests -> prune converged keys -> build bundles ->
//! merge with vector-clock conflict resolution. Each merge is one atomic,
//! idempotent per-key operation, so a round may be abandoned at any point and
//! simply retried on the next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::client::PeerClient;
use super::protocol::*;
use super::round::{RoundPhase, RoundState};
use crate::error::GossipError;
use crate::membership::types::SharedView;
use crate::shard::types::SharedShards;
use crate::storage::entry::Entry;
use crate::storage::kvs::KeyValueStore;
use crate::storage::types::{EntryGlob, TimeGlob};

/// Tuning knobs of the gossip loop.
#[derive(Debug, Clone)]
pub struct GossipConfig {
    /// Time between round starts.
    pub interval: Duration,
    /// A round not finished by then is abandoned and flagged stale.
    pub round_deadline: Duration,
    /// Peers contacted per round.
    pub fanout: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            round_deadline: Duration::from_secs(5),
            fanout: 1,
        }
    }
}

/// Outcome of one completed round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub peers: Vec<String>,
    /// Entries shipped to peers.
    pub pushed: usize,
    /// Peer entries that won locally and were installed.
    pub pulled: usize,
}

/// Round counters since start-up.
#[derive(Debug, Default)]
pub struct GossipStats {
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub stale: AtomicU64,
}

pub struct GossipEngine {
    local_addr: String,
    store: Arc<dyn KeyValueStore>,
    view: SharedView,
    shards: Option<SharedShards>,
    peers: Arc<dyn PeerClient>,
    config: GossipConfig,
    pub stats: GossipStats,
}

impl GossipEngine {
    pub fn new(
        local_addr: impl Into<String>,
        store: Arc<dyn KeyValueStore>,
        view: SharedView,
        shards: Option<SharedShards>,
        peers: Arc<dyn PeerClient>,
        config: GossipConfig,
    ) -> Self {
        Self {
            local_addr: local_addr.into(),
            store,
            view,
            shards,
            peers,
            config,
            stats: GossipStats::default(),
        }
    }

    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    /// Runs one round per tick until `cancel` fires. The in-flight round is
    /// finished or timed out before returning.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(
            "Gossip loop started (interval {:?}, deadline {:?}, fanout {})",
            self.config.interval,
            self.config.round_deadline,
            self.config.fanout
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut round = RoundState::new(self.config.round_deadline);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            if round.is_stale() {
                tracing::debug!("Previous round went stale, retrying");
            }

            match self.run_round(&mut round).await {
                Ok(report) => {
                    if report.pushed > 0 || report.pulled > 0 {
                        tracing::info!(
                            "Gossip with {:?}: pushed {}, pulled {} in {:?}",
                            report.peers,
                            report.pushed,
                            report.pulled,
                            round.elapsed()
                        );
                    }
                }
                Err(e) => tracing::warn!("Gossip round abandoned: {}", e),
            }
        }

        tracing::info!("Gossip loop stopped");
    }

    /// One full round bounded by the round deadline.
    pub async fn run_round(&self, round: &mut RoundState) -> Result<RoundReport, GossipError> {
        round.start();

        let outcome =
            tokio::time::timeout(self.config.round_deadline, self.exchange(&mut *round)).await;

        match outcome {
            Ok(Ok(report)) => {
                round.finish();
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
                Ok(report)
            }
            Ok(Err(e)) => {
                round.abandon();
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
            Err(_) => {
                round.abandon();
                self.stats.stale.fetch_add(1, Ordering::Relaxed);
                Err(GossipError::Deadline(self.config.round_deadline))
            }
        }
    }

    async fn exchange(&self, round: &mut RoundState) -> Result<RoundReport, GossipError> {
        let peers = self.select_peers().await;
        let mut report = RoundReport::default();

        for peer in peers.iter() {
            if round.times_up() {
                return Err(GossipError::Deadline(round.budget()));
            }
            let (pushed, pulled) = self.reconcile_with(peer, round).await?;
            report.pushed += pushed;
            report.pulled += pulled;
            report.peers.push(peer.clone());
        }

        for peer in self.select_topology_peers(&peers).await {
            if round.times_up() {
                return Err(GossipError::Deadline(round.budget()));
            }
            let reply = self
                .peers
                .exchange_topology(&peer, self.topology_snapshot().await)
                .await?;
            self.apply_topology(&reply).await;
        }

        Ok(report)
    }

    async fn reconcile_with(
        &self,
        peer: &str,
        round: &mut RoundState,
    ) -> Result<(usize, usize), GossipError> {
        let request = DigestRequest {
            from: self.local_addr.clone(),
            digest: self.store.get_time_glob().await,
            topology: self.topology_snapshot().await,
        };
        let reply = self.peers.exchange_digest(peer, request).await?;
        round.advance(RoundPhase::DigestsExchanged);
        self.apply_topology(&reply.topology).await;

        let wanted = self.clock_prune(&reply.digest).await;
        round.advance(RoundPhase::Pruned);

        let bundle = self.build_entry_glob(&reply.wanted).await;
        round.advance(RoundPhase::BundlesBuilt);

        if wanted.is_empty() && bundle.is_empty() {
            tracing::debug!("Already converged with {}", peer);
            round.advance(RoundPhase::Merged);
            return Ok((0, 0));
        }

        let pushed = bundle.len();
        let request = EntriesRequest {
            from: self.local_addr.clone(),
            bundle,
            wanted,
        };
        let reply = self.peers.exchange_entries(peer, request).await?;
        let pulled = self.update_kvs(reply.bundle).await;
        round.advance(RoundPhase::Merged);

        Ok((pushed, pulled))
    }

    /// Data peers: our own shard when sharded, otherwise the whole view.
    async fn select_peers(&self) -> Vec<String> {
        match &self.shards {
            Some(shards) => shards.read().await.random_local(self.config.fanout),
            None => self.view.read().await.random(self.config.fanout),
        }
    }

    /// Peers outside our shard that only get metadata this round.
    async fn select_topology_peers(&self, data_peers: &[String]) -> Vec<String> {
        let Some(shards) = &self.shards else {
            return Vec::new();
        };
        let shards = shards.read().await;
        let primary = shards.primary_id().to_string();
        shards
            .random_global(self.config.fanout)
            .into_iter()
            .filter(|peer| !data_peers.contains(peer))
            .filter(|peer| !shards.members(&primary).contains(peer))
            .collect()
    }

    /// Drops every key whose timestamp already matches ours. Keys we lack, or
    /// hold with another timestamp, stay in.
    pub async fn clock_prune(&self, glob: &TimeGlob) -> TimeGlob {
        let local = self.store.get_time_glob().await;
        glob.list
            .iter()
            .filter(|(key, time)| local.list.get(*key) != Some(*time))
            .map(|(key, time)| (key.clone(), *time))
            .collect()
    }

    /// Our entries for the keys in `glob`; keys we do not hold are skipped.
    pub async fn build_entry_glob(&self, glob: &TimeGlob) -> EntryGlob {
        self.store.get_entry_glob(glob).await
    }

    /// Merges every entry of `glob` that beats ours. Returns how many were
    /// installed.
    pub async fn update_kvs(&self, glob: EntryGlob) -> usize {
        let mut applied = 0;
        for (key, entry) in glob.keys {
            if self.store.merge_entry(&key, entry).await {
                applied += 1;
            }
        }
        applied
    }

    /// Whether `incoming` would win against our entry for `key`.
    pub async fn conflict_resolution(&self, key: &str, incoming: &Entry) -> bool {
        self.store.would_yield(key, incoming).await
    }

    /// Replaces the view with a peer-supplied list. An empty list carries no
    /// information and is ignored.
    pub async fn update_views(&self, members: Vec<String>) -> bool {
        if members.is_empty() {
            return false;
        }
        self.view.write().await.overwrite(members);
        true
    }

    pub async fn topology_snapshot(&self) -> Topology {
        let (view, view_epoch) = {
            let view = self.view.read().await;
            (view.list(), view.epoch())
        };
        let shards = match &self.shards {
            Some(shards) => Some(shards.read().await.shard_glob()),
            None => None,
        };
        Topology {
            view,
            view_epoch,
            shards,
        }
    }

    /// Adopts whichever parts of `topology` outrank ours. Each part is
    /// compared and written under one write lock.
    pub async fn apply_topology(&self, topology: &Topology) {
        if self
            .view
            .write()
            .await
            .adopt(&topology.view, topology.view_epoch)
        {
            tracing::info!(
                "Adopted view epoch {}: {}",
                topology.view_epoch,
                topology.view.join(",")
            );
        }

        if let (Some(shards), Some(glob)) = (&self.shards, &topology.shards)
            && shards.write().await.adopt(glob)
        {
            tracing::info!("Adopted shard map epoch {}", glob.epoch);
        }
    }

    // --- Responder side ---

    pub async fn handle_digest(&self, request: DigestRequest) -> DigestResponse {
        tracing::debug!(
            "Digest from {} ({} keys)",
            request.from,
            request.digest.len()
        );
        self.apply_topology(&request.topology).await;

        DigestResponse {
            wanted: self.clock_prune(&request.digest).await,
            digest: self.store.get_time_glob().await,
            topology: self.topology_snapshot().await,
        }
    }

    pub async fn handle_entries(&self, request: EntriesRequest) -> EntriesResponse {
        let bundle = self.build_entry_glob(&request.wanted).await;
        let applied = self.update_kvs(request.bundle).await;
        tracing::debug!(
            "Entries from {}: applied {}, returning {}",
            request.from,
            applied,
            bundle.len()
        );
        EntriesResponse { bundle }
    }

    pub async fn handle_topology(&self, topology: Topology) -> Topology {
        self.apply_topology(&topology).await;
        self.topology_snapshot().await
    }
}
