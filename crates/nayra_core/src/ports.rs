//! crates/nayra_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like storage engines or
//! the image provider's API.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{EditedImage, HistoryItem, ImageUpload, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., storage, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Store has not been initialized")]
    NotInitialized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable key-value storage with one logical key per store.
///
/// Reads return either the last successful write or `None`; writes are
/// all-or-nothing from the caller's point of view.
#[async_trait]
pub trait DurableStorage: Send + Sync {
    // --- User profile ---
    async fn load_user(&self) -> PortResult<Option<User>>;

    async fn save_user(&self, user: &User) -> PortResult<()>;

    async fn remove_user(&self) -> PortResult<()>;

    // --- Provider API key ---
    async fn load_api_key(&self) -> PortResult<Option<String>>;

    async fn save_api_key(&self, api_key: &str) -> PortResult<()>;

    async fn remove_api_key(&self) -> PortResult<()>;

    // --- History list ---
    async fn load_history(&self) -> PortResult<Vec<HistoryItem>>;

    async fn save_history(&self, items: &[HistoryItem]) -> PortResult<()>;
}

/// An opaque, ready-to-use handle to the external image provider, bound to one key.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// A minimal live call used only to confirm the key is usable.
    async fn ping(&self) -> PortResult<()>;

    /// Generates one image from a text prompt and returns it as a data URL.
    async fn generate_image(&self, prompt: &str) -> PortResult<String>;

    /// Applies an instruction to `main`, optionally guided by `reference`.
    async fn edit_image(
        &self,
        prompt: &str,
        main: &ImageUpload,
        reference: Option<&ImageUpload>,
    ) -> PortResult<EditedImage>;

    /// Blends all `images` into one composite and returns it as a data URL.
    async fn combine_images(&self, prompt: &str, images: &[ImageUpload]) -> PortResult<String>;
}

/// Builds provider handles from an API key.
pub trait ProviderConnector: Send + Sync {
    fn connect(&self, api_key: &str) -> Arc<dyn ImageProvider>;
}
