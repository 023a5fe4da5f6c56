use axum::{
    Form, Json,
    extract::{Extension, Path},
    http::StatusCode,
};

use super::protocol::{ChangeShardForm, ShardResponse};
use super::types::SharedShards;
use crate::error::ShardError;

pub async fn handle_my_id(
    Extension(shards): Extension<SharedShards>,
) -> (StatusCode, Json<ShardResponse>) {
    let shards = shards.read().await;
    (
        StatusCode::OK,
        Json(ShardResponse {
            id: Some(shards.primary_id().to_string()),
            ..Default::default()
        }),
    )
}

pub async fn handle_all_ids(
    Extension(shards): Extension<SharedShards>,
) -> (StatusCode, Json<ShardResponse>) {
    let shards = shards.read().await;
    (
        StatusCode::OK,
        Json(ShardResponse {
            shard_ids: Some(shards.all_shards().join(",")),
            ..ShardResponse::success()
        }),
    )
}

pub async fn handle_members(
    Extension(shards): Extension<SharedShards>,
    Path(shard_id): Path<String>,
) -> (StatusCode, Json<ShardResponse>) {
    let shards = shards.read().await;
    if !shards.contains_shard(&shard_id) {
        return (
            StatusCode::NOT_FOUND,
            Json(ShardResponse::error(ShardError::UnknownShard(shard_id).to_string())),
        );
    }

    (
        StatusCode::OK,
        Json(ShardResponse {
            members: Some(shards.members_string(&shard_id).to_string()),
            ..ShardResponse::success()
        }),
    )
}

pub async fn handle_count(
    Extension(shards): Extension<SharedShards>,
    Path(shard_id): Path<String>,
) -> (StatusCode, Json<ShardResponse>) {
    let shards = shards.read().await;
    if !shards.contains_shard(&shard_id) {
        return (
            StatusCode::NOT_FOUND,
            Json(ShardResponse::error(ShardError::UnknownShard(shard_id).to_string())),
        );
    }

    (
        StatusCode::OK,
        Json(ShardResponse {
            count: Some(shards.members(&shard_id).len()),
            ..ShardResponse::success()
        }),
    )
}

pub async fn handle_change_shard_number(
    Extension(shards): Extension<SharedShards>,
    Form(form): Form<ChangeShardForm>,
) -> (StatusCode, Json<ShardResponse>) {
    let n: usize = match form.num.trim().parse() {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Failed to parse shard number {:?}: {}", form.num, e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ShardResponse::error(format!("{} is not a number", form.num))),
            );
        }
    };

    let mut shards = shards.write().await;
    match shards.change_shard_number(n) {
        Ok(()) => (
            StatusCode::OK,
            Json(ShardResponse {
                shard_ids: Some(shards.all_shards().join(",")),
                ..ShardResponse::success()
            }),
        ),
        Err(e) => {
            tracing::warn!("Rejected shard change to {}: {}", n, e);
            let msg = match e {
                ShardError::InsufficientServers { servers, .. } if servers >= n => format!(
                    "Not enough nodes. {} shards result in a nonfault tolerant shard",
                    n
                ),
                _ => format!("Not enough nodes for {} shards", n),
            };
            (StatusCode::BAD_REQUEST, Json(ShardResponse::error(msg)))
        }
    }
}
