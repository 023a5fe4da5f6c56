use axum::{
    Form, Json,
    extract::{Extension, Path},
    http::StatusCode,
};
use std::sync::Arc;

use super::entry::VectorClock;
use super::kvs::KeyValueStore;
use super::protocol::*;
use super::types::{PutOutcome, now_ms};
use crate::error::StoreError;

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Decodes the causal context a client sent along. Missing or malformed
/// payloads count as "no context".
pub fn parse_payload(payload: Option<&str>) -> VectorClock {
    match payload.map(str::trim) {
        None | Some("") => VectorClock::new(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed payload {:?}: {}", raw, e);
            VectorClock::new()
        }),
    }
}

fn encode_payload(clock: &VectorClock) -> Option<String> {
    serde_json::to_string(clock).ok()
}

pub async fn handle_put(
    Extension(store): Extension<SharedStore>,
    Path(key): Path<String>,
    Form(form): Form<PutForm>,
) -> (StatusCode, Json<KvResponse>) {
    let clock = parse_payload(form.payload.as_deref());

    match store.put(&key, form.val, now_ms(), &clock).await {
        Ok(outcome) => {
            let (status, replaced, msg) = match outcome {
                PutOutcome::Created => (StatusCode::CREATED, "False", MSG_ADDED),
                PutOutcome::Updated => (StatusCode::OK, "True", MSG_UPDATED),
            };
            let payload = encode_payload(&store.get_clock(&key).await);
            (
                status,
                Json(KvResponse {
                    replaced: Some(replaced.to_string()),
                    msg: Some(msg.to_string()),
                    payload,
                    ..Default::default()
                }),
            )
        }
        Err(e) => {
            tracing::warn!("Rejected PUT: {}", e);
            let msg = match e {
                StoreError::KeyTooLong { .. } => MSG_KEY_INVALID,
                StoreError::ValueTooLarge { .. } => MSG_VALUE_TOO_LARGE,
            };
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(KvResponse::error(msg)),
            )
        }
    }
}

pub async fn handle_get(
    Extension(store): Extension<SharedStore>,
    Path(key): Path<String>,
) -> (StatusCode, Json<KvResponse>) {
    let (alive, version) = store.contains(&key).await;
    if !alive {
        return (
            StatusCode::NOT_FOUND,
            Json(KvResponse::error(MSG_KEY_MISSING)),
        );
    }

    let value = store.get(&key).await;
    let payload = encode_payload(&store.get_clock(&key).await);
    (
        StatusCode::OK,
        Json(KvResponse {
            value: Some(value),
            version: Some(version),
            payload,
            ..KvResponse::success()
        }),
    )
}

pub async fn handle_delete(
    Extension(store): Extension<SharedStore>,
    Path(key): Path<String>,
    form: Option<Form<PayloadForm>>,
) -> (StatusCode, Json<KvResponse>) {
    let clock = parse_payload(form.as_ref().and_then(|f| f.payload.as_deref()));

    if store.delete(&key, now_ms(), &clock).await {
        let payload = encode_payload(&store.get_clock(&key).await);
        (
            StatusCode::OK,
            Json(KvResponse {
                msg: Some(MSG_DELETED.to_string()),
                payload,
                ..KvResponse::success()
            }),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(KvResponse::error(MSG_KEY_MISSING)),
        )
    }
}

pub async fn handle_search(
    Extension(store): Extension<SharedStore>,
    Path(key): Path<String>,
) -> (StatusCode, Json<KvResponse>) {
    let (alive, version) = store.contains(&key).await;
    let payload = encode_payload(&store.get_clock(&key).await);

    (
        StatusCode::OK,
        Json(KvResponse {
            is_exists: Some(alive.to_string()),
            version: Some(version),
            payload,
            ..KvResponse::success()
        }),
    )
}
