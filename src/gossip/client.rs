use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::protocol::*;
use crate::error::GossipError;

/// Transport used by the gossip engine to talk to one peer.
#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn exchange_digest(
        &self,
        peer: &str,
        request: DigestRequest,
    ) -> Result<DigestResponse, GossipError>;

    async fn exchange_entries(
        &self,
        peer: &str,
        request: EntriesRequest,
    ) -> Result<EntriesResponse, GossipError>;

    async fn exchange_topology(
        &self,
        peer: &str,
        topology: Topology,
    ) -> Result<Topology, GossipError>;
}

fn transport(peer: &str, reason: impl std::fmt::Display) -> GossipError {
    GossipError::Transport {
        peer: peer.to_string(),
        reason: reason.to_string(),
    }
}

/// JSON-over-HTTP peer transport.
pub struct HttpPeerClient {
    http_client: reqwest::Client,
    timeout: Duration,
    attempts: usize,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration, attempts: usize) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
            attempts: attempts.max(1),
        }
    }

    /// POSTs `payload` to `peer`, retrying transport failures and 5xx
    /// replies with capped exponential backoff. Any other non-success status
    /// fails at once.
    async fn post_with_retry<T: Serialize + Sync>(
        &self,
        peer: &str,
        url: &str,
        payload: &T,
    ) -> Result<reqwest::Response, GossipError> {
        let mut attempt = 0;
        loop {
            let failure = match self
                .http_client
                .post(url)
                .json(payload)
                .timeout(self.timeout)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = GossipError::Status {
                        peer: peer.to_string(),
                        status: resp.status().as_u16(),
                    };
                    if !resp.status().is_server_error() {
                        return Err(status);
                    }
                    status
                }
                Err(e) => transport(peer, e),
            };

            attempt += 1;
            if attempt >= self.attempts {
                return Err(failure);
            }
            tracing::debug!("Retrying {} after attempt {}: {}", url, attempt, failure);
            let jitter = Duration::from_millis(rand::random::<u64>() % 50);
            tokio::time::sleep(backoff_delay(attempt) + jitter).await;
        }
    }

    async fn call<Req, Resp>(
        &self,
        peer: &str,
        endpoint: &str,
        request: &Req,
    ) -> Result<Resp, GossipError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("http://{}{}", peer, endpoint);
        let response = self.post_with_retry(peer, &url, request).await?;
        response.json::<Resp>().await.map_err(|e| transport(peer, e))
    }
}

/// Wait before retry number `attempt` (1-based): 100ms doubling up to 800ms.
pub(crate) fn backoff_delay(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(3) as u32;
    Duration::from_millis(100 << shift)
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn exchange_digest(
        &self,
        peer: &str,
        request: DigestRequest,
    ) -> Result<DigestResponse, GossipError> {
        self.call(peer, ENDPOINT_GOSSIP_DIGEST, &request).await
    }

    async fn exchange_entries(
        &self,
        peer: &str,
        request: EntriesRequest,
    ) -> Result<EntriesResponse, GossipError> {
        self.call(peer, ENDPOINT_GOSSIP_ENTRIES, &request).await
    }

    async fn exchange_topology(
        &self,
        peer: &str,
        topology: Topology,
    ) -> Result<Topology, GossipError> {
        self.call(peer, ENDPOINT_GOSSIP_TOPOLOGY, &topology).await
    }
}
