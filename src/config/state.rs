// Application state module
// Shared between every connection task

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use super::types::Config;
use crate::images::ImageStore;
use crate::service::CountryService;
use crate::store::{CountryStore, JsonFileStore};

/// Application state
pub struct AppState {
    pub config: Config,
    pub countries: CountryService,
    /// Connections currently being served
    pub active_connections: AtomicUsize,
}

impl AppState {
    /// Build state backed by the configured JSON file and image directory
    pub fn new(config: &Config) -> Self {
        let store = Arc::new(JsonFileStore::new(&config.storage.data_file));
        Self::with_store(config, store)
    }

    /// Build state over any store implementation
    pub fn with_store(config: &Config, store: Arc<dyn CountryStore>) -> Self {
        let images = ImageStore::new(&config.storage, &config.upload);
        Self {
            config: config.clone(),
            countries: CountryService::new(store, images),
            active_connections: AtomicUsize::new(0),
        }
    }
}
