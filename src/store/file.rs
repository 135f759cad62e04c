// JSON file store
// Persists the collection as a single JSON document, rewritten on every save

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::CountryStore;
use crate::error::CountryError;
use crate::logger;
use crate::model::Collection;

/// File-backed store
pub struct JsonFileStore {
    /// Path to the JSON document
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sibling file the new document is written to before the rename
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CountryStore for JsonFileStore {
    async fn load(&self) -> Result<Collection, CountryError> {
        let bytes = match fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Collection::default()),
            Err(e) => return Err(CountryError::Io(e)),
        };

        serde_json::from_slice(&bytes).map_err(|source| CountryError::CorruptStore {
            path: self.path.display().to_string(),
            source,
        })
    }

    async fn save(&self, collection: &Collection) -> Result<(), CountryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec(collection).map_err(CountryError::Encode)?;

        // Write then rename so readers never see a partial document
        let tmp = self.temp_path();
        fs::write(&tmp, data).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CountryError::Io(e));
        }

        logger::log_debug(&format!(
            "Saved {} countries to {}",
            collection.len(),
            self.path.display()
        ));
        Ok(())
    }
}
