//! In-memory fakes for the core ports, with failure injection.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{EditedImage, HistoryItem, ImageUpload, User};
use crate::ports::{DurableStorage, ImageProvider, PortError, PortResult, ProviderConnector};

#[derive(Default)]
struct Slots {
    user: Option<User>,
    api_key: Option<String>,
    history: Option<Vec<HistoryItem>>,
}

/// A `DurableStorage` that lives as long as the `Arc` does, so several store
/// instances can share it to simulate a process restart.
#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<Slots>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub corrupt_history: AtomicBool,
    pub history_writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stored_user(&self) -> Option<User> {
        self.slots.lock().unwrap().user.clone()
    }

    pub fn stored_api_key(&self) -> Option<String> {
        self.slots.lock().unwrap().api_key.clone()
    }

    pub fn stored_history(&self) -> Option<Vec<HistoryItem>> {
        self.slots.lock().unwrap().history.clone()
    }

    pub fn seed_api_key(&self, key: &str) {
        self.slots.lock().unwrap().api_key = Some(key.to_string());
    }

    fn check_read(&self) -> PortResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("storage unavailable".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("quota exceeded".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStorage for MemoryStorage {
    async fn load_user(&self) -> PortResult<Option<User>> {
        self.check_read()?;
        Ok(self.stored_user())
    }

    async fn save_user(&self, user: &User) -> PortResult<()> {
        self.check_write()?;
        self.slots.lock().unwrap().user = Some(user.clone());
        Ok(())
    }

    async fn remove_user(&self) -> PortResult<()> {
        self.check_write()?;
        self.slots.lock().unwrap().user = None;
        Ok(())
    }

    async fn load_api_key(&self) -> PortResult<Option<String>> {
        self.check_read()?;
        Ok(self.stored_api_key())
    }

    async fn save_api_key(&self, api_key: &str) -> PortResult<()> {
        self.check_write()?;
        self.slots.lock().unwrap().api_key = Some(api_key.to_string());
        Ok(())
    }

    async fn remove_api_key(&self) -> PortResult<()> {
        self.check_write()?;
        self.slots.lock().unwrap().api_key = None;
        Ok(())
    }

    async fn load_history(&self) -> PortResult<Vec<HistoryItem>> {
        self.check_read()?;
        if self.corrupt_history.load(Ordering::SeqCst) {
            return Err(PortError::Corrupt("expected value at line 1 column 1".to_string()));
        }
        Ok(self.stored_history().unwrap_or_default())
    }

    async fn save_history(&self, items: &[HistoryItem]) -> PortResult<()> {
        self.check_write()?;
        self.history_writes.fetch_add(1, Ordering::SeqCst);
        self.slots.lock().unwrap().history = Some(items.to_vec());
        Ok(())
    }
}

/// Accepts only the keys it was built with and counts every ping.
pub struct FakeConnector {
    valid_keys: HashSet<String>,
    pub pings: Arc<AtomicUsize>,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn accepting(keys: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            valid_keys: keys.iter().map(|k| k.to_string()).collect(),
            pings: Arc::new(AtomicUsize::new(0)),
            connects: AtomicUsize::new(0),
        })
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

impl ProviderConnector for FakeConnector {
    fn connect(&self, api_key: &str) -> Arc<dyn ImageProvider> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Arc::new(FakeProvider {
            valid: self.valid_keys.contains(api_key),
            pings: self.pings.clone(),
        })
    }
}

pub struct FakeProvider {
    valid: bool,
    pings: Arc<AtomicUsize>,
}

impl FakeProvider {
    fn check(&self) -> PortResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(PortError::Unauthorized)
        }
    }
}

#[async_trait]
impl ImageProvider for FakeProvider {
    async fn ping(&self) -> PortResult<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        self.check()
    }

    async fn generate_image(&self, prompt: &str) -> PortResult<String> {
        self.check()?;
        Ok(format!("data:image/png;base64,{}", prompt.len()))
    }

    async fn edit_image(
        &self,
        _prompt: &str,
        main: &ImageUpload,
        _reference: Option<&ImageUpload>,
    ) -> PortResult<EditedImage> {
        self.check()?;
        Ok(EditedImage {
            image: main.to_data_url(),
            text: "edited".to_string(),
        })
    }

    async fn combine_images(&self, _prompt: &str, images: &[ImageUpload]) -> PortResult<String> {
        self.check()?;
        images
            .first()
            .map(ImageUpload::to_data_url)
            .ok_or_else(|| PortError::InvalidInput("no images".to_string()))
    }
}
