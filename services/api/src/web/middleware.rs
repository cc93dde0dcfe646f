//! services/api/src/web/middleware.rs
//!
//! Guards for routes that need a signed-up user and, for image work, a usable
//! provider client.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::state::{AppState, ProviderHandle};

/// Rejects the request with 401 Unauthorized unless a user is signed up.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    if state.app.session.current_user().await.is_none() {
        return Err((StatusCode::UNAUTHORIZED, "Please sign up first.".to_string()));
    }
    Ok(next.run(req).await)
}

/// Middleware for the image routes.
///
/// Requires a signed-up user (401) and a usable API key (412). The provider
/// client bound to that key is inserted into the request extensions as a
/// `ProviderHandle` for the handler to use.
pub async fn require_workspace(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    if state.app.session.current_user().await.is_none() {
        return Err((StatusCode::UNAUTHORIZED, "Please sign up first.".to_string()));
    }

    let client = match state.app.credential.client().await {
        Some(client) if state.app.credential.credential().await.is_usable() => client,
        _ => {
            debug!("Rejecting image request: no usable API key");
            return Err((
                StatusCode::PRECONDITION_FAILED,
                "Gemini AI client is not initialized. Please set your API key.".to_string(),
            ));
        }
    };

    req.extensions_mut().insert(ProviderHandle(client));
    Ok(next.run(req).await)
}
