//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every handler and connection.

use crate::config::Config;
use nayra_core::context::AppContext;
use nayra_core::ports::ImageProvider;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<AppContext>,
    pub config: Arc<Config>,
    /// Cancelled when the server starts shutting down; open WebSockets close on it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Creates a new `AppState`.
    pub fn new(app: Arc<AppContext>, config: Arc<Config>, shutdown: CancellationToken) -> Self {
        Self {
            app,
            config,
            shutdown,
        }
    }
}

/// The provider client resolved by the workspace middleware for one request.
#[derive(Clone)]
pub struct ProviderHandle(pub Arc<dyn ImageProvider>);
