//! The three state stores. Each follows the same pattern: load on
//! `initialize`, mutate in memory, persist on mutation, notify subscribers.

pub mod credential;
pub mod history;
pub mod session;

pub use credential::CredentialStore;
pub use history::HistoryStore;
pub use session::{SessionState, SessionStore};
