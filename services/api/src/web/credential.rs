//! services/api/src/web/credential.rs
//!
//! Endpoints for checking, adopting and clearing the provider API key.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use crate::web::protocol::CredentialView;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct VerifyKeyRequest {
    pub api_key: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyKeyResponse {
    pub valid: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct SetKeyRequest {
    /// `null` (or a blank string) clears the key.
    pub api_key: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /credential - Whether a key is set and whether it is considered valid
#[utoipa::path(
    get,
    path = "/credential",
    responses(
        (status = 200, description = "Current credential", body = CredentialView)
    )
)]
pub async fn get_credential_handler(State(state): State<Arc<AppState>>) -> Json<CredentialView> {
    let credential = state.app.credential.credential().await;
    Json(CredentialView::from(&credential))
}

/// POST /credential/verify - Check a key with one live provider call
///
/// Nothing is stored.
#[utoipa::path(
    post,
    path = "/credential/verify",
    request_body = VerifyKeyRequest,
    responses(
        (status = 200, description = "Verification result", body = VerifyKeyResponse)
    )
)]
pub async fn verify_key_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyKeyRequest>,
) -> Json<VerifyKeyResponse> {
    let valid = state.app.credential.verify(&req.api_key).await;
    Json(VerifyKeyResponse { valid })
}

/// PUT /credential - Adopt a key as-is, or clear it
///
/// The key is trusted without verification; use `/credential/connect` to
/// verify first.
#[utoipa::path(
    put,
    path = "/credential",
    request_body = SetKeyRequest,
    responses(
        (status = 200, description = "Credential updated", body = CredentialView)
    )
)]
pub async fn set_key_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetKeyRequest>,
) -> Json<CredentialView> {
    state.app.credential.set_key(req.api_key.as_deref()).await;
    let credential = state.app.credential.credential().await;
    Json(CredentialView::from(&credential))
}

/// POST /credential/connect - Verify a key and adopt it if it works
#[utoipa::path(
    post,
    path = "/credential/connect",
    request_body = VerifyKeyRequest,
    responses(
        (status = 200, description = "Key verified and saved", body = CredentialView),
        (status = 401, description = "The provider rejected the key")
    )
)]
pub async fn connect_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyKeyRequest>,
) -> Result<Json<CredentialView>, (StatusCode, String)> {
    let api_key = req.api_key.trim();
    if !state.app.credential.verify(api_key).await {
        warn!("Refusing to save an API key that failed verification");
        return Err((
            StatusCode::UNAUTHORIZED,
            "Invalid API Key. Please obtain a valid key from Google AI Studio.".to_string(),
        ));
    }

    state.app.credential.set_key(Some(api_key)).await;
    let credential = state.app.credential.credential().await;
    Ok(Json(CredentialView::from(&credential)))
}
