//! services/api/src/web/session.rs
//!
//! Sign-up, sign-out and current-user endpoints backed by the session store.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use nayra_core::domain::User;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::info;
use utoipa::ToSchema;

use crate::web::protocol::UserView;
use crate::web::rest::port_error_response;
use crate::web::state::AppState;

const EMAIL_PATTERN: &str = r"\S+@\S+\.\S+";

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"));

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub name: String,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    /// `null` when nobody is signed up.
    pub user: Option<UserView>,
}

/// Trims both fields and checks them the way the sign-up form does.
fn validate_login(req: &LoginRequest) -> Result<User, (StatusCode, String)> {
    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() || email.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please fill out both fields.".to_string(),
        ));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please enter a valid email address.".to_string(),
        ));
    }

    Ok(User {
        name: name.to_string(),
        email: email.to_string(),
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /session - The signed-up user, if any
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse)
    )
)]
pub async fn get_session_handler(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let user = state.app.session.current_user().await.map(UserView::from);
    Json(SessionResponse { user })
}

/// POST /session/login - Sign up with a name and an email address
#[utoipa::path(
    post,
    path = "/session/login",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Signed up", body = UserView),
        (status = 400, description = "Missing name or malformed email"),
        (status = 409, description = "A user is already signed up"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = validate_login(&req)?;

    state
        .app
        .session
        .login(user.clone())
        .await
        .map_err(port_error_response)?;
    info!("User signed up");

    Ok((StatusCode::CREATED, Json(UserView::from(user))))
}

/// POST /session/logout - Sign out
#[utoipa::path(
    post,
    path = "/session/logout",
    responses(
        (status = 204, description = "Signed out (or nobody was signed up)"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .app
        .session
        .logout()
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
