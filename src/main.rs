use axum::{
    Router,
    extract::Extension,
    routing::{get, post, put},
};
use clap::Parser;
use replicated_kvs::config::Config;
use replicated_kvs::gossip::client::HttpPeerClient;
use replicated_kvs::gossip::engine::GossipEngine;
use replicated_kvs::gossip::handlers::*;
use replicated_kvs::gossip::protocol::*;
use replicated_kvs::membership::handlers::*;
use replicated_kvs::membership::types::{ENDPOINT_VIEW, SharedView};
use replicated_kvs::membership::view::ViewList;
use replicated_kvs::shard::handlers::*;
use replicated_kvs::shard::list::ShardList;
use replicated_kvs::shard::protocol::*;
use replicated_kvs::shard::types::SharedShards;
use replicated_kvs::storage::handlers::*;
use replicated_kvs::storage::kvs::Kvs;
use replicated_kvs::storage::protocol::*;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    tracing::info!(
        "Starting replicated-kvs {} on {}",
        env!("CARGO_PKG_VERSION"),
        config.ip_port
    );

    // 1. Local store:
    let store: SharedStore = Arc::new(Kvs::new(config.ip_port.clone()));

    // 2. Membership view and shard map:
    let servers = config.servers();
    let view: SharedView = Arc::new(RwLock::new(ViewList::new(
        &config.ip_port,
        &servers.join(","),
    )));
    let shards: SharedShards = Arc::new(RwLock::new(ShardList::new(
        &config.ip_port,
        &servers,
        config.shards,
    )?));
    tracing::info!("View: {}", servers.join(","));

    // 3. Gossip engine:
    let gossip = config.gossip();
    let peer_client = Arc::new(HttpPeerClient::new(gossip.round_deadline / 2, 3));
    let engine = Arc::new(GossipEngine::new(
        config.ip_port.clone(),
        store.clone(),
        view.clone(),
        Some(shards.clone()),
        peer_client,
        gossip,
    ));

    // 4. HTTP Router:
    let app = Router::new()
        .route(
            &format!("{}/:key", ENDPOINT_KEY_VALUE),
            put(handle_put).get(handle_get).delete(handle_delete),
        )
        .route(&format!("{}/:key", ENDPOINT_SEARCH), get(handle_search))
        .route(
            ENDPOINT_VIEW,
            get(handle_get_view)
                .put(handle_add_view)
                .delete(handle_remove_view),
        )
        .route(ENDPOINT_SHARD_MY_ID, get(handle_my_id))
        .route(ENDPOINT_SHARD_ALL_IDS, get(handle_all_ids))
        .route(&format!("{}/:id", ENDPOINT_SHARD_MEMBERS), get(handle_members))
        .route(&format!("{}/:id", ENDPOINT_SHARD_COUNT), get(handle_count))
        .route(
            ENDPOINT_SHARD_CHANGE_NUMBER,
            put(handle_change_shard_number),
        )
        .route(ENDPOINT_GOSSIP_DIGEST, post(handle_gossip_digest))
        .route(ENDPOINT_GOSSIP_ENTRIES, post(handle_gossip_entries))
        .route(ENDPOINT_GOSSIP_TOPOLOGY, post(handle_gossip_topology))
        .layer(Extension(store))
        .layer(Extension(view))
        .layer(Extension(shards))
        .layer(Extension(engine.clone()));

    // 5. Spawn gossip loop:
    let cancel = CancellationToken::new();
    let gossip_task = tokio::spawn(engine.clone().run(cancel.clone()));

    // 6. Start HTTP server:
    let listener = tokio::net::TcpListener::bind(&config.ip_port).await?;
    tracing::info!("HTTP server listening on {}", config.ip_port);
    tracing::info!("Press Ctrl+C to shutdown");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    if tokio::time::timeout(Duration::from_secs(10), gossip_task)
        .await
        .is_err()
    {
        tracing::warn!("Gossip loop did not stop in time");
    }

    let stats = &engine.stats;
    tracing::info!(
        "Gossip rounds: {} completed, {} failed, {} stale",
        stats.completed.load(Ordering::Relaxed),
        stats.failed.load(Ordering::Relaxed),
        stats.stale.load(Ordering::Relaxed)
    );

    Ok(())
}
