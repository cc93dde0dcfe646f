pub mod credential;
pub mod history;
pub mod images;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod session;
pub mod state;
pub mod ws_handler;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::{require_user, require_workspace};
pub use state::AppState;
pub use ws_handler::ws_handler;

/// Builds every API route. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no user required)
    let public_routes = Router::new()
        .route("/screen", get(rest::screen_handler))
        .route("/session", get(session::get_session_handler))
        .route("/session/login", post(session::login_handler))
        .route("/session/logout", post(session::logout_handler))
        .route(
            "/credential",
            get(credential::get_credential_handler).put(credential::set_key_handler),
        )
        .route("/credential/verify", post(credential::verify_key_handler))
        .route("/credential/connect", post(credential::connect_handler))
        .route("/events", get(ws_handler));

    // History routes (a signed-up user is required)
    let history_routes = Router::new()
        .route(
            "/history",
            get(history::list_history_handler)
                .post(history::add_history_handler)
                .delete(history::clear_history_handler),
        )
        .route(
            "/history/{id}",
            get(history::get_history_handler).delete(history::delete_history_handler),
        )
        .route("/history/{id}/download", get(history::download_history_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_user,
        ));

    // Image routes (a signed-up user and a usable API key are required)
    let image_routes = Router::new()
        .route("/images/generate", post(images::generate_handler))
        .route("/images/edit", post(images::edit_handler))
        .route("/images/combine", post(images::combine_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_workspace,
        ));

    // Multipart bodies carry several images, each up to the configured limit.
    let body_limit = app_state.config.max_upload_bytes.saturating_mul(4);

    Router::new()
        .merge(public_routes)
        .merge(history_routes)
        .merge(image_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}
