//! services/api/src/web/images.rs
//!
//! Generate, edit and combine endpoints. Each calls the provider client bound
//! to the current API key and records the result in the history.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use nayra_core::domain::{HistoryItemType, NewHistoryItem};
use nayra_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::adapters::upload::read_image_form;
use crate::web::protocol::HistoryItemView;
use crate::web::rest::port_error_response;
use crate::web::state::{AppState, ProviderHandle};

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// The response payload for a generated or combined image.
#[derive(Serialize, ToSchema)]
pub struct ImageResponse {
    /// The history item recording the new image.
    pub item: HistoryItemView,
}

/// The response payload for an edited image.
#[derive(Serialize, ToSchema)]
pub struct EditResponse {
    pub item: HistoryItemView,
    /// Whatever text the model returned alongside the image.
    pub text: String,
}

/// Maps a provider failure to a response carrying `message`.
///
/// Rejected keys and bad input keep their own status; everything else is a
/// failure of the upstream service.
fn provider_failure(e: PortError, message: &str) -> (StatusCode, String) {
    match e {
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, message.to_string()),
        PortError::InvalidInput(detail) => (StatusCode::BAD_REQUEST, detail),
        _ => (StatusCode::BAD_GATEWAY, message.to_string()),
    }
}

fn bad_request(message: &str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.to_string())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Generate an image from a text prompt.
#[utoipa::path(
    post,
    path = "/images/generate",
    request_body = GenerateRequest,
    responses(
        (status = 201, description = "Image generated and recorded", body = ImageResponse),
        (status = 400, description = "Empty prompt"),
        (status = 401, description = "Nobody is signed up"),
        (status = 412, description = "No usable API key"),
        (status = 502, description = "The provider failed")
    )
)]
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Extension(ProviderHandle(client)): Extension<ProviderHandle>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(bad_request("Please enter a prompt."));
    }

    let image = client.generate_image(prompt).await.map_err(|e| {
        error!("Error generating image: {}", e);
        provider_failure(e, "Failed to generate image. Please check the prompt or API key.")
    })?;

    let item = state
        .app
        .history
        .add(NewHistoryItem {
            kind: HistoryItemType::Generated,
            image,
            prompt: prompt.to_string(),
        })
        .await;
    info!("Generated image recorded as {}", item.id);

    Ok((
        StatusCode::CREATED,
        Json(ImageResponse {
            item: item.into(),
        }),
    ))
}

/// Edit an uploaded image.
///
/// Accepts a multipart/form-data request with a `prompt` text field, an
/// `image` file and an optional `reference` file used as a style guide.
#[utoipa::path(
    post,
    path = "/images/edit",
    request_body(content_type = "multipart/form-data", description = "Fields: prompt, image, reference (optional)."),
    responses(
        (status = 201, description = "Image edited and recorded", body = EditResponse),
        (status = 400, description = "Missing prompt or image, or an unsupported upload"),
        (status = 401, description = "Nobody is signed up"),
        (status = 412, description = "No usable API key"),
        (status = 502, description = "The provider failed")
    )
)]
pub async fn edit_handler(
    State(state): State<Arc<AppState>>,
    Extension(ProviderHandle(client)): Extension<ProviderHandle>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let form = read_image_form(multipart, state.config.max_upload_bytes)
        .await
        .map_err(port_error_response)?;

    let missing = "Please upload an image and enter an editing instruction.";
    let prompt = form.require_prompt().map_err(|_| bad_request(missing))?;
    let main = form.file("image").ok_or_else(|| bad_request(missing))?;

    let edited = client
        .edit_image(prompt, main, form.file("reference"))
        .await
        .map_err(|e| {
            error!("Error editing image: {}", e);
            provider_failure(
                e,
                "Failed to edit image. The model may not have been able to fulfill the request.",
            )
        })?;

    let item = state
        .app
        .history
        .add(NewHistoryItem {
            kind: HistoryItemType::Edited,
            image: edited.image,
            prompt: prompt.to_string(),
        })
        .await;
    info!("Edited image recorded as {}", item.id);

    Ok((
        StatusCode::CREATED,
        Json(EditResponse {
            item: item.into(),
            text: edited.text,
        }),
    ))
}

/// Blend several uploaded images into one.
///
/// Accepts a multipart/form-data request with a `prompt` text field and two
/// or more `images` files.
#[utoipa::path(
    post,
    path = "/images/combine",
    request_body(content_type = "multipart/form-data", description = "Fields: prompt, images (repeated, at least two)."),
    responses(
        (status = 201, description = "Images combined and recorded", body = ImageResponse),
        (status = 400, description = "Fewer than two images, or a missing prompt"),
        (status = 401, description = "Nobody is signed up"),
        (status = 412, description = "No usable API key"),
        (status = 502, description = "The provider failed")
    )
)]
pub async fn combine_handler(
    State(state): State<Arc<AppState>>,
    Extension(ProviderHandle(client)): Extension<ProviderHandle>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let form = read_image_form(multipart, state.config.max_upload_bytes)
        .await
        .map_err(port_error_response)?;

    let images = form.files("images");
    if images.len() < 2 {
        return Err(bad_request("Please upload at least two images to combine."));
    }
    let prompt = form.require_prompt().map_err(|_| {
        bad_request("Please enter a prompt to describe how to combine the images.")
    })?;

    let image = client.combine_images(prompt, &images).await.map_err(|e| {
        error!("Error combining images: {}", e);
        provider_failure(e, "Failed to combine images. Please check your images and prompt.")
    })?;

    let item = state
        .app
        .history
        .add(NewHistoryItem {
            kind: HistoryItemType::Combined,
            image,
            prompt: prompt.to_string(),
        })
        .await;
    info!("Combined image recorded as {}", item.id);

    Ok((
        StatusCode::CREATED,
        Json(ImageResponse {
            item: item.into(),
        }),
    ))
}
