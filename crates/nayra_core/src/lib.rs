pub mod context;
pub mod domain;
pub mod events;
pub mod ports;
pub mod stores;

#[cfg(test)]
pub(crate) mod testing;

pub use context::AppContext;
pub use domain::{
    Credential, EditedImage, HistoryItem, HistoryItemType, ImageUpload, NewHistoryItem, Screen,
    User,
};
pub use events::{Observers, StoreEvent};
pub use ports::{DurableStorage, ImageProvider, PortError, PortResult, ProviderConnector};
pub use stores::{CredentialStore, HistoryStore, SessionState, SessionStore};
