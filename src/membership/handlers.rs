use axum::{Form, Json, extract::Extension, http::StatusCode};

use super::types::{SharedView, ViewForm, ViewResponse};
use crate::shard::types::SharedShards;

pub async fn handle_get_view(
    Extension(view): Extension<SharedView>,
) -> (StatusCode, Json<ViewResponse>) {
    let view = view.read().await;
    (
        StatusCode::OK,
        Json(ViewResponse {
            view: Some(view.joined()),
            ..Default::default()
        }),
    )
}

pub async fn handle_add_view(
    Extension(view): Extension<SharedView>,
    Extension(shards): Extension<SharedShards>,
    Form(form): Form<ViewForm>,
) -> (StatusCode, Json<ViewResponse>) {
    let addr = form.ip_port.trim().to_string();

    if !view.write().await.add(&addr) {
        return (
            StatusCode::NOT_FOUND,
            Json(ViewResponse {
                result: Some("Error".to_string()),
                msg: Some(format!("{} is already in view", addr)),
                ..Default::default()
            }),
        );
    }
    shards.write().await.add_server(&addr);

    (
        StatusCode::OK,
        Json(ViewResponse {
            result: Some("Success".to_string()),
            msg: Some(format!("Successfully added {} to view", addr)),
            ..Default::default()
        }),
    )
}

pub async fn handle_remove_view(
    Extension(view): Extension<SharedView>,
    Extension(shards): Extension<SharedShards>,
    Form(form): Form<ViewForm>,
) -> (StatusCode, Json<ViewResponse>) {
    let addr = form.ip_port.trim().to_string();

    if !view.write().await.remove(&addr) {
        return (
            StatusCode::NOT_FOUND,
            Json(ViewResponse {
                result: Some("Error".to_string()),
                msg: Some(format!("{} is not in current view", addr)),
                ..Default::default()
            }),
        );
    }
    shards.write().await.remove_server(&addr);

    (
        StatusCode::OK,
        Json(ViewResponse {
            result: Some("Success".to_string()),
            msg: Some(format!("Successfully removed {} from view", addr)),
            ..Default::default()
        }),
    )
}
