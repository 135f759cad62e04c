//! Flag image storage
//!
//! Uploaded images are checked in memory against the allowed MIME types and
//! the size limit, and only then written under a generated file name. The
//! same directory is served read-only under the image route.

use std::path::{Path, PathBuf};

use hyper::body::Bytes;
use tokio::fs;
use uuid::Uuid;

use crate::config::{StorageConfig, UploadConfig};
use crate::error::CountryError;
use crate::http::mime;
use crate::logger;

/// Image payload buffered from a request
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Declared MIME type, parameters stripped
    pub content_type: String,
    pub data: Bytes,
}

pub struct ImageStore {
    dir: PathBuf,
    /// Route prefix without slashes, e.g. `images`
    url_prefix: String,
    max_size: usize,
    allowed_types: Vec<String>,
}

impl ImageStore {
    pub fn new(storage: &StorageConfig, upload: &UploadConfig) -> Self {
        Self {
            dir: PathBuf::from(&storage.image_dir),
            url_prefix: storage.image_route.trim_matches('/').to_string(),
            max_size: upload.max_image_size,
            allowed_types: upload.allowed_types.clone(),
        }
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reject disallowed types first, then oversized payloads
    pub fn check(&self, image: &UploadedImage) -> Result<(), CountryError> {
        if !self
            .allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&image.content_type))
        {
            return Err(CountryError::InvalidFileType {
                mime: image.content_type.clone(),
            });
        }

        if image.data.len() > self.max_size {
            return Err(CountryError::UnsupportedMedia {
                size: image.data.len(),
                limit: self.max_size,
            });
        }

        Ok(())
    }

    /// Write an already checked image and return its relative flag path
    pub async fn persist(&self, image: &UploadedImage) -> Result<String, CountryError> {
        fs::create_dir_all(&self.dir).await?;

        let file_name = match mime::extension_for(&image.content_type) {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4().simple()),
            None => Uuid::new_v4().simple().to_string(),
        };
        fs::write(self.dir.join(&file_name), &image.data).await?;

        logger::log_debug(&format!(
            "Stored image {file_name} ({} bytes)",
            image.data.len()
        ));
        Ok(self.flag_for(&file_name))
    }

    /// Remove a file previously returned by `persist`; failures are only logged
    pub async fn discard(&self, flag: &str) {
        let Some(file_name) = self.file_name_of(flag) else {
            return;
        };
        if let Err(e) = fs::remove_file(self.dir.join(file_name)).await {
            logger::log_warning(&format!("Failed to remove orphaned image '{flag}': {e}"));
        }
    }

    fn flag_for(&self, file_name: &str) -> String {
        if self.url_prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{file_name}", self.url_prefix)
        }
    }

    fn file_name_of<'a>(&self, flag: &'a str) -> Option<&'a str> {
        let name = if self.url_prefix.is_empty() {
            flag
        } else {
            flag.strip_prefix(&self.url_prefix)?.strip_prefix('/')?
        };
        (!name.is_empty() && !name.contains(['/', '\\']) && name != "..").then_some(name)
    }
}
