//! Country operations over an injected store
//!
//! Reads go straight to the store. Adds run load, validate, persist image,
//! append and save under one lock, so concurrent adds keep names and ranks unique.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::CountryError;
use crate::images::{ImageStore, UploadedImage};
use crate::logger;
use crate::model::{Country, NewCountry};
use crate::store::CountryStore;

pub struct CountryService {
    store: Arc<dyn CountryStore>,
    images: ImageStore,
    write_lock: Mutex<()>,
}

impl CountryService {
    pub fn new(store: Arc<dyn CountryStore>, images: ImageStore) -> Self {
        Self {
            store,
            images,
            write_lock: Mutex::new(()),
        }
    }

    pub const fn images(&self) -> &ImageStore {
        &self.images
    }

    pub async fn list(&self) -> Result<Vec<Country>, CountryError> {
        Ok(self.store.load().await?.countries)
    }

    /// `Ok(None)` when no country has that exact name
    pub async fn get(&self, name: &str) -> Result<Option<Country>, CountryError> {
        let collection = self.store.load().await?;
        Ok(collection.find(name).cloned())
    }

    pub async fn add(
        &self,
        new: NewCountry,
        image: Option<UploadedImage>,
    ) -> Result<Country, CountryError> {
        if let Some(img) = &image {
            self.images.check(img)?;
        }

        let _guard = self.write_lock.lock().await;

        let mut collection = self.store.load().await?;
        if collection.conflicts_with(&new) {
            return Err(CountryError::DuplicateEntry);
        }

        let flag = match &image {
            Some(img) => Some(self.images.persist(img).await?),
            None => None,
        };

        let country = new.into_country(flag);
        collection.countries.push(country.clone());

        if let Err(e) = self.store.save(&collection).await {
            if let Some(flag) = &country.flag {
                self.images.discard(flag).await;
            }
            return Err(e);
        }

        logger::log_info(&format!(
            "[Store] Added country '{}' (rank {}), {} total",
            country.name,
            country.rank,
            collection.len()
        ));
        Ok(country)
    }

    /// Readiness probe: the store must load cleanly
    pub async fn check_ready(&self) -> Result<(), CountryError> {
        self.store.load().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageConfig, UploadConfig};
    use crate::model::{Collection, CountryForm};
    use crate::store::memory::MemoryStore;
    use hyper::body::Bytes;
    use std::path::PathBuf;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: Arc<CountryService>,
        dir: PathBuf,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn fixture_with(collection: Collection) -> Fixture {
        let dir = std::env::temp_dir().join(format!(
            "country_service_{}",
            uuid::Uuid::new_v4().simple()
        ));
        let images = ImageStore::new(
            &StorageConfig {
                data_file: dir.join("data.json").display().to_string(),
                image_dir: dir.join("images").display().to_string(),
                image_route: "/images".to_string(),
            },
            &UploadConfig::default(),
        );
        let store = Arc::new(MemoryStore::with(collection));
        let service = Arc::new(CountryService::new(store.clone(), images));
        Fixture {
            store,
            service,
            dir,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Collection::default())
    }

    fn new_country(name: &str, rank: &str, continent: &str) -> NewCountry {
        NewCountry::parse(CountryForm {
            name: Some(name.to_string()),
            continent: Some(continent.to_string()),
            rank: Some(rank.to_string()),
        })
        .unwrap()
    }

    fn png(size: usize) -> UploadedImage {
        UploadedImage {
            content_type: "image/png".to_string(),
            data: Bytes::from(vec![7u8; size]),
        }
    }

    fn image_count(f: &Fixture) -> usize {
        std::fs::read_dir(f.dir.join("images")).map_or(0, Iterator::count)
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let f = fixture();
        assert!(f.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_idempotent() {
        let f = fixture();
        f.service
            .add(new_country("Wakanda", "1", "Africa"), None)
            .await
            .unwrap();
        let first = f.service.list().await.unwrap();
        let second = f.service.list().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let f = fixture();
        let created = f
            .service
            .add(new_country("Wakanda", "1", "Africa"), None)
            .await
            .unwrap();
        assert_eq!(created.flag, None);

        let found = f.service.get("Wakanda").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.continent, "Africa");
        assert_eq!(found.rank, 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let f = fixture();
        assert_eq!(f.service.get("Atlantis").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_keeps_insertion_order() {
        let f = fixture();
        for (name, rank) in [("C", "3"), ("A", "1"), ("B", "2")] {
            f.service
                .add(new_country(name, rank, "Nowhere"), None)
                .await
                .unwrap();
        }
        let names: Vec<_> = f
            .service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["C", "A", "B"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_or_rank_rejected() {
        let f = fixture();
        f.service
            .add(new_country("Wakanda", "1", "Africa"), None)
            .await
            .unwrap();

        let err = f
            .service
            .add(new_country("Wakanda", "2", "Africa"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CountryError::DuplicateEntry));

        let err = f
            .service
            .add(new_country("Genovia", "1", "Europe"), Some(png(8)))
            .await
            .unwrap_err();
        assert!(matches!(err, CountryError::DuplicateEntry));

        assert_eq!(f.service.list().await.unwrap().len(), 1);
        assert_eq!(f.store.save_count(), 1);
        assert_eq!(image_count(&f), 0);
    }

    #[tokio::test]
    async fn test_add_with_image_sets_flag() {
        let f = fixture();
        let created = f
            .service
            .add(new_country("Genovia", "4", "Europe"), Some(png(32)))
            .await
            .unwrap();

        let flag = created.flag.unwrap();
        assert!(flag.starts_with("images/") && flag.ends_with(".png"));
        let on_disk = f.dir.join(&flag);
        assert_eq!(std::fs::read(on_disk).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_rejected_images_leave_no_trace() {
        let f = fixture();
        let gif = UploadedImage {
            content_type: "image/gif".to_string(),
            data: Bytes::from_static(b"GIF89a"),
        };
        let err = f
            .service
            .add(new_country("Genovia", "4", "Europe"), Some(gif))
            .await
            .unwrap_err();
        assert!(matches!(err, CountryError::InvalidFileType { .. }));

        let err = f
            .service
            .add(new_country("Genovia", "4", "Europe"), Some(png(5 * 1024 * 1024)))
            .await
            .unwrap_err();
        assert!(matches!(err, CountryError::UnsupportedMedia { .. }));

        assert!(f.service.list().await.unwrap().is_empty());
        assert_eq!(f.store.save_count(), 0);
        assert_eq!(image_count(&f), 0);
    }

    #[tokio::test]
    async fn test_failed_save_discards_image() {
        let f = fixture();
        f.store.fail_saves(true);

        let err = f
            .service
            .add(new_country("Genovia", "4", "Europe"), Some(png(16)))
            .await
            .unwrap_err();
        assert!(matches!(err, CountryError::Io(_)));
        assert_eq!(image_count(&f), 0);
        assert!(f.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_names_unique() {
        let f = fixture();
        let mut handles = Vec::new();
        for rank in 1..=8 {
            let service = Arc::clone(&f.service);
            handles.push(tokio::spawn(async move {
                service
                    .add(new_country("Wakanda", &rank.to_string(), "Africa"), None)
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(f.service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_ranks_unique() {
        let f = fixture();
        let mut handles = Vec::new();
        for i in 0..8 {
            let service = Arc::clone(&f.service);
            handles.push(tokio::spawn(async move {
                service
                    .add(new_country(&format!("Country {i}"), "42", "Atlantis"), None)
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(country) => {
                    assert_eq!(country.rank, 42);
                    successes += 1;
                }
                Err(e) => assert!(matches!(e, CountryError::DuplicateEntry), "{e:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(f.service.list().await.unwrap().len(), 1);
        assert_eq!(f.store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_ready_with_existing_data() {
        let f = fixture_with(Collection {
            countries: vec![new_country("Wakanda", "1", "Africa").into_country(None)],
        });
        assert!(f.service.check_ready().await.is_ok());
        assert_eq!(f.service.list().await.unwrap().len(), 1);
    }
}
