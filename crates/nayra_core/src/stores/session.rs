//! crates/nayra_core/src/stores/session.rs
//!
//! The single-user session: at most one signed-up user, mirrored to durable storage.

use futures::channel::mpsc::UnboundedReceiver;
use futures::lock::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::User;
use crate::events::{Observers, StoreEvent};
use crate::ports::{DurableStorage, PortError, PortResult};

/// `Uninitialized -> {LoggedOut, LoggedIn}`, then `LoggedOut <-> LoggedIn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    LoggedOut,
    LoggedIn(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::LoggedIn(user) => Some(user),
            _ => None,
        }
    }
}

pub struct SessionStore {
    storage: Arc<dyn DurableStorage>,
    state: Mutex<SessionState>,
    observers: Observers,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            storage,
            state: Mutex::new(SessionState::Uninitialized),
            observers: Observers::new(),
        }
    }

    /// Restores the persisted user, if any. Missing or unreadable data leaves
    /// the session logged out.
    pub async fn initialize(&self) {
        let mut state = self.state.lock().await;

        let restored = match self.storage.load_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!("Failed to load user from durable storage: {}", e);
                None
            }
        };

        *state = match restored {
            Some(user) => {
                info!("Restored session for {}", user.email);
                SessionState::LoggedIn(user)
            }
            None => SessionState::LoggedOut,
        };
        self.observers.notify(StoreEvent::SessionChanged {
            user: state.user().cloned(),
        });
    }

    /// Persists `user` and makes it current. The caller validates the fields.
    ///
    /// The in-memory state only changes once the durable write has succeeded.
    pub async fn login(&self, user: User) -> PortResult<()> {
        let mut state = self.state.lock().await;
        match &*state {
            SessionState::Uninitialized => return Err(PortError::NotInitialized),
            SessionState::LoggedIn(current) => {
                return Err(PortError::Conflict(format!(
                    "{} is already logged in",
                    current.email
                )))
            }
            SessionState::LoggedOut => {}
        }

        self.storage.save_user(&user).await.map_err(|e| {
            error!("Failed to save user to durable storage: {}", e);
            e
        })?;

        info!("User {} logged in", user.email);
        *state = SessionState::LoggedIn(user.clone());
        self.observers
            .notify(StoreEvent::SessionChanged { user: Some(user) });
        Ok(())
    }

    /// Erases the persisted user and clears the session. Logging out while
    /// already logged out is a no-op.
    pub async fn logout(&self) -> PortResult<()> {
        let mut state = self.state.lock().await;
        match &*state {
            SessionState::Uninitialized => return Err(PortError::NotInitialized),
            SessionState::LoggedOut => return Ok(()),
            SessionState::LoggedIn(_) => {}
        }

        self.storage.remove_user().await.map_err(|e| {
            error!("Failed to remove user from durable storage: {}", e);
            e
        })?;

        info!("User logged out");
        *state = SessionState::LoggedOut;
        self.observers.notify(StoreEvent::SessionChanged { user: None });
        Ok(())
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.lock().await.user().cloned()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<StoreEvent> {
        self.observers.subscribe()
    }

    /// Ends every subscription and returns the store to `Uninitialized`.
    pub async fn dispose(&self) {
        *self.state.lock().await = SessionState::Uninitialized;
        self.observers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStorage;
    use futures::StreamExt;
    use std::sync::atomic::Ordering;

    fn ada() -> User {
        User {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    async fn initialized(storage: &Arc<MemoryStorage>) -> SessionStore {
        let store = SessionStore::new(storage.clone());
        store.initialize().await;
        store
    }

    #[tokio::test]
    async fn starts_uninitialized() {
        let store = SessionStore::new(MemoryStorage::new());
        assert_eq!(store.state().await, SessionState::Uninitialized);
        assert_eq!(store.current_user().await, None);
    }

    #[tokio::test]
    async fn initialize_without_record_is_logged_out() {
        let store = initialized(&MemoryStorage::new()).await;
        assert_eq!(store.state().await, SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn login_survives_a_fresh_store_instance() {
        let storage = MemoryStorage::new();
        let store = initialized(&storage).await;
        store.login(ada()).await.unwrap();
        assert_eq!(store.current_user().await, Some(ada()));

        let restarted = initialized(&storage).await;
        assert_eq!(restarted.current_user().await, Some(ada()));
    }

    #[tokio::test]
    async fn logout_survives_a_fresh_store_instance() {
        let storage = MemoryStorage::new();
        let store = initialized(&storage).await;
        store.login(ada()).await.unwrap();
        store.logout().await.unwrap();
        assert_eq!(store.state().await, SessionState::LoggedOut);

        let restarted = initialized(&storage).await;
        assert_eq!(restarted.current_user().await, None);
        assert_eq!(storage.stored_user(), None);
    }

    #[tokio::test]
    async fn failed_write_leaves_state_untouched() {
        let storage = MemoryStorage::new();
        let store = initialized(&storage).await;
        storage.fail_writes.store(true, Ordering::SeqCst);

        assert!(store.login(ada()).await.is_err());
        assert_eq!(store.state().await, SessionState::LoggedOut);
        assert_eq!(storage.stored_user(), None);
    }

    #[tokio::test]
    async fn failed_erase_keeps_user_logged_in() {
        let storage = MemoryStorage::new();
        let store = initialized(&storage).await;
        store.login(ada()).await.unwrap();
        storage.fail_writes.store(true, Ordering::SeqCst);

        assert!(store.logout().await.is_err());
        assert_eq!(store.current_user().await, Some(ada()));
    }

    #[tokio::test]
    async fn unreadable_storage_initializes_logged_out() {
        let storage = MemoryStorage::new();
        initialized(&storage).await.login(ada()).await.unwrap();
        storage.fail_reads.store(true, Ordering::SeqCst);

        let store = initialized(&storage).await;
        assert_eq!(store.state().await, SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn mutations_before_initialize_are_rejected() {
        let store = SessionStore::new(MemoryStorage::new());
        assert_eq!(store.login(ada()).await, Err(PortError::NotInitialized));
        assert_eq!(store.logout().await, Err(PortError::NotInitialized));
    }

    #[tokio::test]
    async fn second_login_is_a_conflict() {
        let store = initialized(&MemoryStorage::new()).await;
        store.login(ada()).await.unwrap();

        let grace = User {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
        };
        assert!(matches!(store.login(grace).await, Err(PortError::Conflict(_))));
        assert_eq!(store.current_user().await, Some(ada()));
    }

    #[tokio::test]
    async fn logout_when_logged_out_is_a_no_op() {
        let store = initialized(&MemoryStorage::new()).await;
        store.logout().await.unwrap();
        assert_eq!(store.state().await, SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn subscribers_see_login_and_logout() {
        let store = initialized(&MemoryStorage::new()).await;
        let mut events = store.subscribe();

        store.login(ada()).await.unwrap();
        store.logout().await.unwrap();

        assert_eq!(
            events.next().await,
            Some(StoreEvent::SessionChanged { user: Some(ada()) })
        );
        assert_eq!(
            events.next().await,
            Some(StoreEvent::SessionChanged { user: None })
        );
    }

    #[tokio::test]
    async fn dispose_resets_and_closes_subscriptions() {
        let store = initialized(&MemoryStorage::new()).await;
        let mut events = store.subscribe();
        store.dispose().await;

        assert_eq!(store.state().await, SessionState::Uninitialized);
        assert_eq!(events.next().await, None);
    }
}
