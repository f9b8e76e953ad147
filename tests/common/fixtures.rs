use super::constants::*;
use arrangement_catalog::catalog_store::{
    CatalogEntry, CatalogStore, Category, Difficulty, EntryDraft, Price, StorageCatalogStore,
};
use arrangement_catalog::storage::MemoryStorage;
use chrono::{TimeZone, Utc};
use std::sync::Arc;

/// In-memory storage plus a store over it. Clone the storage to get another
/// "tab" on the same catalog.
pub struct TestCatalog {
    pub storage: MemoryStorage,
    pub store: Arc<StorageCatalogStore>,
}

impl TestCatalog {
    pub fn empty() -> Self {
        let storage = MemoryStorage::new();
        let store = Arc::new(StorageCatalogStore::new(Arc::new(storage.clone())));
        Self { storage, store }
    }

    pub fn seeded() -> Self {
        let catalog = Self::empty();
        seed_catalog(catalog.store.as_ref());
        catalog
    }

    /// Another store handle over the same storage.
    #[allow(dead_code)]
    pub fn other_tab(&self) -> Arc<StorageCatalogStore> {
        Arc::new(StorageCatalogStore::new(Arc::new(self.storage.clone())))
    }
}

pub fn entry(
    id: &str,
    title: &str,
    category: Category,
    difficulty: Difficulty,
    price: u32,
    year: i32,
) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        title: title.to_string(),
        composer: "Test Composer".to_string(),
        category,
        subcategory: None,
        difficulty,
        duration: "3:00".to_string(),
        description: format!("{} arrangement", title),
        instrumentation: vec!["Snare".to_string(), "Bass".to_string()],
        tempo: Some("120".to_string()),
        key_signature: None,
        year_composed: year,
        tags: vec!["original".to_string()],
        price: Price {
            standard: price,
            exclusive: price * 10,
        },
        files: None,
        upload_date: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    }
}

pub fn seed_catalog(store: &dyn CatalogStore) {
    let entries = [
        entry(THUNDER_ID, "Thunder Strike", Category::Drumline, Difficulty::Advanced, 80, 2019),
        entry(WALTZ_ID, "Calm Waltz", Category::FullBand, Difficulty::Beginner, 20, 2001),
        entry(BOSS_ID, "Boss Battle", Category::MediaGaming, Difficulty::Advanced, 50, 2022),
        entry(RUDIMENTS_ID, "Daily Rudiments", Category::Warmups, Difficulty::Beginner, 0, 2015),
    ];
    for entry in entries {
        store.upsert(entry).unwrap();
    }
}

/// A form submission that passes validation.
pub fn draft(title: &str) -> EntryDraft {
    EntryDraft {
        title: title.to_string(),
        composer: "M. Rivera".to_string(),
        category: "Full Band".to_string(),
        difficulty: "Intermediate".to_string(),
        description: "Festival opener".to_string(),
        duration: "4:10".to_string(),
        instrumentation: "Flutes, Clarinets,  Trumpets ,".to_string(),
        tempo: "132".to_string(),
        key_signature: "Bb Major".to_string(),
        year_composed: "2020".to_string(),
        tags: "concert, opener".to_string(),
        price_standard: "75".to_string(),
        price_exclusive: "600".to_string(),
        ..Default::default()
    }
}
