//! services/api/src/web/rest.rs
//!
//! Contains the screen endpoint, the shared mapping from port errors to HTTP
//! responses, and the master definition for the OpenAPI specification.

use crate::web::{credential, history, images, protocol, session, state::AppState};
use axum::{extract::State, http::StatusCode, Json};
use nayra_core::ports::PortError;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        screen_handler,
        session::get_session_handler,
        session::login_handler,
        session::logout_handler,
        credential::get_credential_handler,
        credential::verify_key_handler,
        credential::set_key_handler,
        credential::connect_handler,
        history::list_history_handler,
        history::add_history_handler,
        history::clear_history_handler,
        history::get_history_handler,
        history::download_history_handler,
        history::delete_history_handler,
        images::generate_handler,
        images::edit_handler,
        images::combine_handler,
    ),
    components(
        schemas(
            ScreenResponse,
            protocol::ScreenView,
            protocol::UserView,
            protocol::CredentialView,
            protocol::HistoryItemView,
            session::LoginRequest,
            session::SessionResponse,
            credential::VerifyKeyRequest,
            credential::VerifyKeyResponse,
            credential::SetKeyRequest,
            history::NewHistoryItemRequest,
            images::GenerateRequest,
            images::ImageResponse,
            images::EditResponse,
        )
    ),
    tags(
        (name = "Nayra AI API", description = "API endpoints for generating, editing and combining images.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a `PortError` to the status and message returned to the client.
pub fn port_error_response(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Conflict(_) => StatusCode::CONFLICT,
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
        PortError::Corrupt(_) | PortError::Unexpected(_) => {
            error!("Request failed: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ScreenResponse {
    pub screen: protocol::ScreenView,
}

/// The screen the UI shell should show, derived from the session and credential.
#[utoipa::path(
    get,
    path = "/screen",
    responses(
        (status = 200, description = "Current screen", body = ScreenResponse)
    )
)]
pub async fn screen_handler(State(state): State<Arc<AppState>>) -> Json<ScreenResponse> {
    let screen = state.app.screen().await.into();
    Json(ScreenResponse { screen })
}
