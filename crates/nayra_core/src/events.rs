//! crates/nayra_core/src/events.rs
//!
//! Change notifications emitted by the stores after each successful mutation.

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use std::sync::Mutex;

use crate::domain::{Credential, User};

/// What changed, carrying the state a subscriber needs to re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    SessionChanged { user: Option<User> },
    /// The key itself is never broadcast.
    CredentialChanged { has_key: bool, is_valid: Option<bool> },
    HistoryChanged { len: usize },
}

impl StoreEvent {
    pub(crate) fn credential(credential: &Credential) -> Self {
        StoreEvent::CredentialChanged {
            has_key: credential.api_key.is_some(),
            is_valid: credential.is_valid,
        }
    }
}

/// A subscriber list. Closed receivers are dropped on the next notify.
#[derive(Default)]
pub struct Observers {
    senders: Mutex<Vec<UnboundedSender<StoreEvent>>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<StoreEvent> {
        let (tx, rx) = mpsc::unbounded();
        self.lock().push(tx);
        rx
    }

    pub fn notify(&self, event: StoreEvent) {
        self.lock()
            .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }

    /// Drops every subscriber, ending their streams.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UnboundedSender<StoreEvent>>> {
        // A panic while holding this lock cannot leave the Vec half-updated.
        self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn every_subscriber_receives_each_event() {
        let observers = Observers::new();
        let mut a = observers.subscribe();
        let mut b = observers.subscribe();

        observers.notify(StoreEvent::HistoryChanged { len: 1 });

        assert_eq!(a.next().await, Some(StoreEvent::HistoryChanged { len: 1 }));
        assert_eq!(b.next().await, Some(StoreEvent::HistoryChanged { len: 1 }));
    }

    #[test]
    fn closed_receivers_are_pruned_on_notify() {
        let observers = Observers::new();
        let kept = observers.subscribe();
        drop(observers.subscribe());
        assert_eq!(observers.len(), 2);

        observers.notify(StoreEvent::HistoryChanged { len: 0 });

        assert_eq!(observers.len(), 1);
        drop(kept);
    }

    #[tokio::test]
    async fn clear_ends_subscriber_streams() {
        let observers = Observers::new();
        let mut rx = observers.subscribe();
        observers.clear();
        assert!(observers.is_empty());
        assert_eq!(rx.next().await, None);
    }
}
