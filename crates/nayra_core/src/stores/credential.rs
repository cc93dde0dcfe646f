//! crates/nayra_core/src/stores/credential.rs
//!
//! Holds the provider API key, its validity flag and the provider client
//! derived from it.

use futures::channel::mpsc::UnboundedReceiver;
use futures::lock::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::Credential;
use crate::events::{Observers, StoreEvent};
use crate::ports::{DurableStorage, ImageProvider, ProviderConnector};

#[derive(Default)]
struct CredentialState {
    initialized: bool,
    credential: Credential,
    /// Present exactly when `credential.api_key` is.
    client: Option<Arc<dyn ImageProvider>>,
}

impl CredentialState {
    /// Adopts `api_key` as trusted. No verification happens here.
    fn adopt(&mut self, api_key: &str, connector: &dyn ProviderConnector) {
        self.client = Some(connector.connect(api_key));
        self.credential = Credential {
            api_key: Some(api_key.to_string()),
            is_valid: Some(true),
        };
        self.initialized = true;
    }

    fn unset(&mut self) {
        self.client = None;
        self.credential = Credential {
            api_key: None,
            is_valid: Some(false),
        };
        self.initialized = true;
    }
}

pub struct CredentialStore {
    storage: Arc<dyn DurableStorage>,
    connector: Arc<dyn ProviderConnector>,
    state: Mutex<CredentialState>,
    observers: Observers,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn DurableStorage>, connector: Arc<dyn ProviderConnector>) -> Self {
        Self {
            storage,
            connector,
            state: Mutex::new(CredentialState::default()),
            observers: Observers::new(),
        }
    }

    /// Restores the persisted key. A restored key is trusted without a new
    /// verification round-trip.
    pub async fn initialize(&self) {
        let mut state = self.state.lock().await;

        match self.storage.load_api_key().await {
            Ok(Some(api_key)) if !api_key.trim().is_empty() => {
                info!("Restored provider API key from durable storage");
                state.adopt(&api_key, self.connector.as_ref());
            }
            Ok(_) => state.unset(),
            Err(e) => {
                warn!("Failed to load API key from durable storage: {}", e);
                state.unset();
            }
        }
        self.observers.notify(StoreEvent::credential(&state.credential));
    }

    /// Makes one minimal live call with `api_key`. Every failure collapses to `false`.
    ///
    /// Blank keys are rejected without touching the network.
    pub async fn verify(&self, api_key: &str) -> bool {
        if api_key.trim().is_empty() {
            return false;
        }

        let probe = self.connector.connect(api_key);
        match probe.ping().await {
            Ok(()) => {
                info!("Provider API key verified");
                true
            }
            Err(e) => {
                warn!("API key validation failed: {}", e);
                false
            }
        }
    }

    /// Adopts a non-blank key (persisting it, building a client and marking it
    /// valid) or, for `None`/blank, erases the key.
    ///
    /// Callers are expected to have called [`CredentialStore::verify`] first;
    /// this method trusts whatever it is given. Storage failures are logged and
    /// the in-memory state is updated regardless.
    pub async fn set_key(&self, api_key: Option<&str>) {
        let mut state = self.state.lock().await;

        match api_key.filter(|key| !key.trim().is_empty()) {
            Some(api_key) => {
                if let Err(e) = self.storage.save_api_key(api_key).await {
                    error!("Failed to save API key to durable storage: {}", e);
                }
                state.adopt(api_key, self.connector.as_ref());
                info!("Provider API key set");
            }
            None => {
                if let Err(e) = self.storage.remove_api_key().await {
                    error!("Failed to remove API key from durable storage: {}", e);
                }
                state.unset();
                info!("Provider API key cleared");
            }
        }
        self.observers.notify(StoreEvent::credential(&state.credential));
    }

    pub async fn credential(&self) -> Credential {
        self.state.lock().await.credential.clone()
    }

    /// The provider client for the current key, if one is set.
    pub async fn client(&self) -> Option<Arc<dyn ImageProvider>> {
        self.state.lock().await.client.clone()
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.initialized
    }

    pub fn subscribe(&self) -> UnboundedReceiver<StoreEvent> {
        self.observers.subscribe()
    }

    /// Drops the client, forgets the in-memory key and ends every subscription.
    pub async fn dispose(&self) {
        *self.state.lock().await = CredentialState::default();
        self.observers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeConnector, MemoryStorage};
    use futures::StreamExt;
    use std::sync::atomic::Ordering;

    fn store(storage: &Arc<MemoryStorage>, connector: &Arc<FakeConnector>) -> CredentialStore {
        CredentialStore::new(storage.clone(), connector.clone())
    }

    #[tokio::test]
    async fn is_unchecked_before_initialize() {
        let store = store(&MemoryStorage::new(), &FakeConnector::accepting(&[]));
        assert!(!store.is_initialized().await);
        assert_eq!(store.credential().await.is_valid, None);
        assert!(store.client().await.is_none());
    }

    #[tokio::test]
    async fn initialize_without_key_is_invalid() {
        let store = store(&MemoryStorage::new(), &FakeConnector::accepting(&[]));
        store.initialize().await;

        let credential = store.credential().await;
        assert_eq!(credential.api_key, None);
        assert_eq!(credential.is_valid, Some(false));
        assert!(store.client().await.is_none());
    }

    #[tokio::test]
    async fn restored_key_is_trusted_without_a_new_round_trip() {
        let storage = MemoryStorage::new();
        storage.seed_api_key("restored-key");
        let connector = FakeConnector::accepting(&[]);
        let store = store(&storage, &connector);

        store.initialize().await;

        let credential = store.credential().await;
        assert_eq!(credential.api_key.as_deref(), Some("restored-key"));
        assert_eq!(credential.is_valid, Some(true));
        assert!(store.client().await.is_some());
        assert_eq!(connector.ping_count(), 0);
    }

    #[tokio::test]
    async fn unreadable_key_is_treated_as_absent() {
        let storage = MemoryStorage::new();
        storage.seed_api_key("key");
        storage.fail_reads.store(true, Ordering::SeqCst);
        let store = store(&storage, &FakeConnector::accepting(&["key"]));

        store.initialize().await;
        assert_eq!(store.credential().await.is_valid, Some(false));
        assert!(store.client().await.is_none());
    }

    #[tokio::test]
    async fn verify_accepts_a_working_key() {
        let connector = FakeConnector::accepting(&["good"]);
        let store = store(&MemoryStorage::new(), &connector);
        assert!(store.verify("good").await);
        assert_eq!(connector.ping_count(), 1);
    }

    #[tokio::test]
    async fn verify_collapses_provider_errors_to_false() {
        let connector = FakeConnector::accepting(&["good"]);
        let store = store(&MemoryStorage::new(), &connector);
        assert!(!store.verify("bad").await);
        assert_eq!(connector.ping_count(), 1);
    }

    #[tokio::test]
    async fn verify_of_empty_key_makes_no_call() {
        let connector = FakeConnector::accepting(&[""]);
        let store = store(&MemoryStorage::new(), &connector);
        assert!(!store.verify("").await);
        assert!(!store.verify("   ").await);
        assert_eq!(connector.ping_count(), 0);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn verify_does_not_change_state() {
        let store = store(&MemoryStorage::new(), &FakeConnector::accepting(&["good"]));
        store.initialize().await;
        assert!(store.verify("good").await);
        assert_eq!(store.credential().await.api_key, None);
    }

    #[tokio::test]
    async fn set_key_trusts_an_unverified_key() {
        let storage = MemoryStorage::new();
        let connector = FakeConnector::accepting(&[]);
        let store = store(&storage, &connector);
        store.initialize().await;

        store.set_key(Some("badkey")).await;

        let credential = store.credential().await;
        assert_eq!(credential.api_key.as_deref(), Some("badkey"));
        assert_eq!(credential.is_valid, Some(true));
        assert!(store.client().await.is_some());
        assert_eq!(storage.stored_api_key().as_deref(), Some("badkey"));
        assert_eq!(connector.ping_count(), 0);
    }

    #[tokio::test]
    async fn set_key_survives_a_fresh_store_instance() {
        let storage = MemoryStorage::new();
        let connector = FakeConnector::accepting(&["good"]);
        store(&storage, &connector).set_key(Some("good")).await;

        let restarted = store(&storage, &connector);
        restarted.initialize().await;
        assert_eq!(restarted.credential().await.api_key.as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn clearing_the_key_drops_the_client() {
        let storage = MemoryStorage::new();
        let store = store(&storage, &FakeConnector::accepting(&["good"]));
        store.set_key(Some("good")).await;

        store.set_key(None).await;

        let credential = store.credential().await;
        assert_eq!(credential.api_key, None);
        assert_eq!(credential.is_valid, Some(false));
        assert!(store.client().await.is_none());
        assert_eq!(storage.stored_api_key(), None);
    }

    #[tokio::test]
    async fn blank_key_is_treated_as_none() {
        let store = store(&MemoryStorage::new(), &FakeConnector::accepting(&[]));
        store.set_key(Some("good")).await;
        store.set_key(Some("  ")).await;
        assert!(store.client().await.is_none());
        assert_eq!(store.credential().await.is_valid, Some(false));
    }

    #[tokio::test]
    async fn storage_failure_still_updates_memory() {
        let storage = MemoryStorage::new();
        storage.fail_writes.store(true, Ordering::SeqCst);
        let store = store(&storage, &FakeConnector::accepting(&["good"]));

        store.set_key(Some("good")).await;

        assert!(store.credential().await.is_usable());
        assert_eq!(storage.stored_api_key(), None);
    }

    #[tokio::test]
    async fn client_is_bound_to_the_current_key() {
        let store = store(&MemoryStorage::new(), &FakeConnector::accepting(&["good"]));
        store.set_key(Some("good")).await;
        let client = store.client().await.unwrap();
        assert!(client.ping().await.is_ok());

        store.set_key(Some("other")).await;
        let client = store.client().await.unwrap();
        assert!(client.ping().await.is_err());
    }

    #[tokio::test]
    async fn subscribers_never_see_the_key() {
        let store = store(&MemoryStorage::new(), &FakeConnector::accepting(&[]));
        let mut events = store.subscribe();

        store.set_key(Some("secret")).await;

        assert_eq!(
            events.next().await,
            Some(StoreEvent::CredentialChanged {
                has_key: true,
                is_valid: Some(true)
            })
        );
    }

    #[tokio::test]
    async fn dispose_forgets_the_client() {
        let store = store(&MemoryStorage::new(), &FakeConnector::accepting(&[]));
        store.set_key(Some("key")).await;
        store.dispose().await;

        assert!(store.client().await.is_none());
        assert!(!store.is_initialized().await);
        assert_eq!(store.credential().await, Credential::default());
    }
}
