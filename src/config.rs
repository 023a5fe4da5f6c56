use anyhow::{Result, bail};
use clap::Parser;
use std::time::Duration;

use crate::gossip::engine::GossipConfig;

/// Replica start-up configuration. Every flag can also come from the
/// environment, which is how container deployments pass it in.
#[derive(Debug, Clone, Parser)]
#[command(name = "replicated-kvs", version, about)]
pub struct Config {
    /// Address this replica listens on and identifies itself with.
    #[arg(long = "ip-port", env = "IP_PORT")]
    pub ip_port: String,

    /// Comma separated addresses of every server in the cluster.
    #[arg(long, env = "VIEW", default_value = "")]
    pub view: String,

    /// Initial number of shards.
    #[arg(long, env = "S", default_value_t = 1)]
    pub shards: usize,

    /// Milliseconds between gossip rounds.
    #[arg(long, env = "GOSSIP_INTERVAL_MS", default_value_t = 1000)]
    pub gossip_interval_ms: u64,

    /// Milliseconds a gossip round may take before it is abandoned.
    #[arg(long, env = "ROUND_DEADLINE_MS", default_value_t = 5000)]
    pub round_deadline_ms: u64,

    /// Peers contacted per gossip round.
    #[arg(long, env = "GOSSIP_FANOUT", default_value_t = 1)]
    pub fanout: usize,
}

impl Config {
    /// Every server address from `view`, with ourselves appended if missing.
    pub fn servers(&self) -> Vec<String> {
        let mut servers: Vec<String> = self
            .view
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !servers.contains(&self.ip_port) {
            servers.push(self.ip_port.clone());
        }
        servers
    }

    pub fn validate(&self) -> Result<()> {
        if self.ip_port.trim().is_empty() {
            bail!("IP_PORT must not be empty");
        }
        if self.shards == 0 {
            bail!("shard count must be at least 1");
        }
        let servers = self.servers().len();
        if self.shards > 1 && servers / self.shards < 2 {
            bail!(
                "{} servers cannot form {} shards of at least 2 servers",
                servers,
                self.shards
            );
        }
        if self.round_deadline_ms == 0 || self.gossip_interval_ms == 0 {
            bail!("gossip interval and round deadline must be positive");
        }
        Ok(())
    }

    pub fn gossip(&self) -> GossipConfig {
        GossipConfig {
            interval: Duration::from_millis(self.gossip_interval_ms),
            round_deadline: Duration::from_millis(self.round_deadline_ms),
            fanout: self.fanout.max(1),
        }
    }
}
