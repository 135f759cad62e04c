// In-memory store used by tests in place of the JSON file

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CountryStore;
use crate::error::CountryError;
use crate::model::Collection;

#[derive(Default)]
pub struct MemoryStore {
    collection: RwLock<Collection>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn with(collection: Collection) -> Self {
        Self {
            collection: RwLock::new(collection),
            ..Self::default()
        }
    }

    /// Make every following `save` fail with an I/O error
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CountryStore for MemoryStore {
    async fn load(&self) -> Result<Collection, CountryError> {
        Ok(self.collection.read().await.clone())
    }

    async fn save(&self, collection: &Collection) -> Result<(), CountryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CountryError::Io(std::io::Error::other("disk full")));
        }
        *self.collection.write().await = collection.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
