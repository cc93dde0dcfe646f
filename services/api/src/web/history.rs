//! services/api/src/web/history.rs
//!
//! Endpoints for listing, fetching, downloading, adding, deleting and clearing
//! history items.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use nayra_core::domain::{HistoryItem, HistoryItemType, ImageUpload, NewHistoryItem};
use nayra_core::ports::PortError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::web::protocol::HistoryItemView;
use crate::web::rest::port_error_response;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct NewHistoryItemRequest {
    /// One of `Generated`, `Edited` or `Combined`.
    #[serde(rename = "type")]
    pub kind: String,
    pub image: String,
    pub prompt: String,
}

/// GET /history - All items, newest first
#[utoipa::path(
    get,
    path = "/history",
    responses(
        (status = 200, description = "History list", body = Vec<HistoryItemView>),
        (status = 401, description = "Nobody is signed up")
    )
)]
pub async fn list_history_handler(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryItemView>> {
    let items = state.app.history.items().await;
    Json(items.into_iter().map(HistoryItemView::from).collect())
}

/// POST /history - Record an item; id and timestamp are assigned here
#[utoipa::path(
    post,
    path = "/history",
    request_body = NewHistoryItemRequest,
    responses(
        (status = 201, description = "Item recorded", body = HistoryItemView),
        (status = 400, description = "Unknown item type"),
        (status = 401, description = "Nobody is signed up")
    )
)]
pub async fn add_history_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewHistoryItemRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let kind = req
        .kind
        .parse::<HistoryItemType>()
        .map_err(port_error_response)?;

    let item = state
        .app
        .history
        .add(NewHistoryItem {
            kind,
            image: req.image,
            prompt: req.prompt,
        })
        .await;

    Ok((StatusCode::CREATED, Json(HistoryItemView::from(item))))
}

/// Looks up `id`, answering 404 when it is not in the list.
async fn find_item(state: &AppState, id: &str) -> Result<HistoryItem, (StatusCode, String)> {
    state
        .app
        .history
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("No history item with id {}", id)))
}

/// The file name the UI saves a downloaded item under.
fn download_file_name(item: &HistoryItem) -> String {
    format!("nayra-ai-{}-{}.png", item.kind.as_str().to_lowercase(), item.id)
}

/// GET /history/{id} - One item
#[utoipa::path(
    get,
    path = "/history/{id}",
    params(
        ("id" = String, Path, description = "The history item id.")
    ),
    responses(
        (status = 200, description = "The item", body = HistoryItemView),
        (status = 401, description = "Nobody is signed up"),
        (status = 404, description = "No item with that id")
    )
)]
pub async fn get_history_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HistoryItemView>, (StatusCode, String)> {
    let item = find_item(&state, &id).await?;
    Ok(Json(HistoryItemView::from(item)))
}

/// GET /history/{id}/download - The item's image as a file attachment
#[utoipa::path(
    get,
    path = "/history/{id}/download",
    params(
        ("id" = String, Path, description = "The history item id.")
    ),
    responses(
        (status = 200, description = "The decoded image bytes, served with the image's MIME type"),
        (status = 401, description = "Nobody is signed up"),
        (status = 404, description = "No item with that id"),
        (status = 422, description = "The stored image is not a base64 data URL")
    )
)]
pub async fn download_history_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let item = find_item(&state, &id).await?;

    let unreadable = |e: PortError| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
    let upload = ImageUpload::from_data_url(&item.image).map_err(unreadable)?;
    let bytes = upload.decode().map_err(unreadable)?;

    let disposition = format!("attachment; filename=\"{}\"", download_file_name(&item));
    Ok((
        [
            (header::CONTENT_TYPE, upload.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// DELETE /history - Remove every item
#[utoipa::path(
    delete,
    path = "/history",
    responses(
        (status = 204, description = "History cleared"),
        (status = 401, description = "Nobody is signed up")
    )
)]
pub async fn clear_history_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.app.history.clear().await;
    info!("History cleared");
    StatusCode::NO_CONTENT
}

/// DELETE /history/{id} - Remove one item
#[utoipa::path(
    delete,
    path = "/history/{id}",
    params(
        ("id" = String, Path, description = "The history item id.")
    ),
    responses(
        (status = 204, description = "Item removed"),
        (status = 401, description = "Nobody is signed up"),
        (status = 404, description = "No item with that id")
    )
)]
pub async fn delete_history_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let removed = state
        .app
        .history
        .delete_by_id(&id)
        .await
        .map_err(port_error_response)?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("No history item with id {}", id)))
    }
}
