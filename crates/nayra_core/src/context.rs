//! crates/nayra_core/src/context.rs
//!
//! Composes the three stores into the application's root state object.
//! Constructed once and handed to whatever consumes it.

use std::sync::Arc;

use crate::domain::Screen;
use crate::ports::{DurableStorage, ProviderConnector};
use crate::stores::{CredentialStore, HistoryStore, SessionState, SessionStore};

pub struct AppContext {
    pub session: Arc<SessionStore>,
    pub credential: Arc<CredentialStore>,
    pub history: Arc<HistoryStore>,
}

impl AppContext {
    pub fn new(storage: Arc<dyn DurableStorage>, connector: Arc<dyn ProviderConnector>) -> Self {
        Self {
            session: Arc::new(SessionStore::new(storage.clone())),
            credential: Arc::new(CredentialStore::new(storage.clone(), connector)),
            history: Arc::new(HistoryStore::new(storage)),
        }
    }

    /// Loads every store from durable storage. Must complete before
    /// [`AppContext::screen`] means anything.
    pub async fn initialize(&self) {
        futures::join!(
            self.session.initialize(),
            self.credential.initialize(),
            self.history.initialize(),
        );
    }

    pub async fn dispose(&self) {
        futures::join!(
            self.session.dispose(),
            self.credential.dispose(),
            self.history.dispose(),
        );
    }

    /// Picks the screen from the session and credential state.
    pub async fn screen(&self) -> Screen {
        let session = self.session.state().await;
        if session == SessionState::Uninitialized || !self.credential.is_initialized().await {
            return Screen::Loading;
        }
        if session.user().is_none() {
            return Screen::SignUp;
        }
        if !self.credential.credential().await.is_usable() {
            return Screen::KeySetup;
        }
        Screen::Workspace
    }
}
