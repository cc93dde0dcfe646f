//! crates/nayra_core/src/stores/history.rs
//!
//! The newest-first list of generated, edited and combined images.

use chrono::Utc;
use futures::channel::mpsc::UnboundedReceiver;
use futures::lock::Mutex;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::{HistoryItem, NewHistoryItem};
use crate::events::{Observers, StoreEvent};
use crate::ports::{DurableStorage, PortError, PortResult};

#[derive(Default)]
struct HistoryState {
    initialized: bool,
    items: Vec<HistoryItem>,
}

pub struct HistoryStore {
    storage: Arc<dyn DurableStorage>,
    state: Mutex<HistoryState>,
    observers: Observers,
}

impl HistoryStore {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            storage,
            state: Mutex::new(HistoryState::default()),
            observers: Observers::new(),
        }
    }

    /// Loads the persisted list. Missing or corrupt data yields an empty list.
    pub async fn initialize(&self) {
        let mut state = self.state.lock().await;
        self.load_into(&mut state).await;
        self.observers.notify(StoreEvent::HistoryChanged {
            len: state.items.len(),
        });
    }

    /// Stamps `entry` with a fresh id and the current time, puts it at the head
    /// of the list and persists the whole list.
    pub async fn add(&self, entry: NewHistoryItem) -> HistoryItem {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;

        let item = HistoryItem {
            id: next_history_id(),
            kind: entry.kind,
            image: entry.image,
            prompt: entry.prompt,
            timestamp: Utc::now().timestamp_millis(),
        };
        debug!("Adding {} history item {}", item.kind, item.id);
        state.items.insert(0, item.clone());

        self.persist(&state.items).await;
        self.observers.notify(StoreEvent::HistoryChanged {
            len: state.items.len(),
        });
        item
    }

    /// Removes the item with `id`. Returns `Ok(false)` without touching storage
    /// when no such item exists.
    pub async fn delete_by_id(&self, id: &str) -> PortResult<bool> {
        if id.is_empty() {
            return Err(PortError::InvalidInput(
                "A history item id is required".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;

        let Some(index) = state.items.iter().position(|item| item.id == id) else {
            return Ok(false);
        };
        state.items.remove(index);

        self.persist(&state.items).await;
        self.observers.notify(StoreEvent::HistoryChanged {
            len: state.items.len(),
        });
        Ok(true)
    }

    /// Empties the list and persists the empty list.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await;

        let had_items = !state.items.is_empty();
        state.items.clear();

        self.persist(&state.items).await;
        if had_items {
            self.observers
                .notify(StoreEvent::HistoryChanged { len: 0 });
        }
    }

    /// A snapshot of the list, newest first.
    pub async fn items(&self) -> Vec<HistoryItem> {
        self.state.lock().await.items.clone()
    }

    pub async fn get(&self, id: &str) -> Option<HistoryItem> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn subscribe(&self) -> UnboundedReceiver<StoreEvent> {
        self.observers.subscribe()
    }

    /// Forgets the in-memory list and ends every subscription.
    pub async fn dispose(&self) {
        *self.state.lock().await = HistoryState::default();
        self.observers.clear();
    }

    // A mutation before `initialize` would otherwise overwrite the durable list.
    async fn ensure_loaded(&self, state: &mut HistoryState) {
        if !state.initialized {
            self.load_into(state).await;
        }
    }

    async fn load_into(&self, state: &mut HistoryState) {
        state.items = match self.storage.load_history().await {
            Ok(items) => items,
            Err(e) => {
                warn!("Failed to load history from durable storage: {}", e);
                Vec::new()
            }
        };
        state.initialized = true;
    }

    async fn persist(&self, items: &[HistoryItem]) {
        if let Err(e) = self.storage.save_history(items).await {
            error!("Failed to save history to durable storage: {}", e);
        }
    }
}

fn next_history_id() -> String {
    format!("hist-{}", Uuid::new_v4())
}
