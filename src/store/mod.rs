// Country storage module
// Backing store abstraction for the country collection

mod file;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::error::CountryError;
use crate::model::Collection;

pub use file::JsonFileStore;

/// Load and save the whole collection
///
/// Implementations hold no cache: `load` must reflect the last successful `save`.
#[async_trait]
pub trait CountryStore: Send + Sync {
    /// Current collection, empty when nothing has been stored yet
    async fn load(&self) -> Result<Collection, CountryError>;

    /// Replace the stored collection wholesale
    async fn save(&self, collection: &Collection) -> Result<(), CountryError>;
}
