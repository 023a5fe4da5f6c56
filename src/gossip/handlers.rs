use axum::{Json, extract::Extension};
use std::sync::Arc;

use super::engine::GossipEngine;
use super::protocol::*;

pub async fn handle_gossip_digest(
    Extension(engine): Extension<Arc<GossipEngine>>,
    Json(req): Json<DigestRequest>,
) -> Json<DigestResponse> {
    Json(engine.handle_digest(req).await)
}

pub async fn handle_gossip_entries(
    Extension(engine): Extension<Arc<GossipEngine>>,
    Json(req): Json<EntriesRequest>,
) -> Json<EntriesResponse> {
    Json(engine.handle_entries(req).await)
}

pub async fn handle_gossip_topology(
    Extension(engine): Extension<Arc<GossipEngine>>,
    Json(req): Json<Topology>,
) -> Json<Topology> {
    Json(engine.handle_topology(req).await)
}
