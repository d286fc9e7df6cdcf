//! Per-URL cache entries.
//!
//! Each entry file holds one [`PageResult`] and the time it was written.
//! Entries are keyed by URL digest only, so several sitemap indexes may
//! point at the same file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::layout::{self, CacheLayout};
use crate::{Error, PageResult};

/// A cached page result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub result: PageResult,
    pub timestamp: DateTime<Utc>,
    /// Label of the sitemap that last wrote this entry.
    pub sitemap: String,
}

impl CacheEntry {
    pub fn new(result: PageResult, sitemap: impl Into<String>) -> Self {
        Self { url: result.url.clone(), result, timestamp: Utc::now(), sitemap: sitemap.into() }
    }
}

/// Reads and writes entry files under `<root>/urls/`.
#[derive(Debug, Clone)]
pub struct EntryStore {
    layout: CacheLayout,
}

impl EntryStore {
    pub fn new(layout: CacheLayout) -> Self {
        Self { layout }
    }

    /// Load the entry for `url`.
    pub async fn load(&self, url: &str) -> Result<CacheEntry, Error> {
        self.load_file(&layout::entry_file_name(url)).await
    }

    /// Load an entry by the file name an index maps to.
    pub async fn load_file(&self, file_name: &str) -> Result<CacheEntry, Error> {
        layout::read_json(&self.layout.entry_path(file_name)).await
    }

    /// Write `entry`, replacing any previous entry for the same URL.
    ///
    /// Returns the entry file name to record in an index.
    pub async fn save(&self, entry: &CacheEntry) -> Result<String, Error> {
        let file_name = layout::entry_file_name(&entry.url);
        layout::write_json(&self.layout.entry_path(&file_name), entry).await?;
        Ok(file_name)
    }

    /// Delete an entry file. Returns false if it did not exist.
    pub async fn remove_file(&self, file_name: &str) -> Result<bool, Error> {
        layout::remove_file(&self.layout.entry_path(file_name)).await
    }

    pub async fn exists(&self, file_name: &str) -> bool {
        tokio::fs::try_exists(self.layout.entry_path(file_name))
            .await
            .unwrap_or(false)
    }

    pub async fn size(&self, file_name: &str) -> u64 {
        layout::file_size(&self.layout.entry_path(file_name)).await
    }

    /// All entry file names currently on disk.
    pub async fn list(&self) -> Result<Vec<String>, Error> {
        let names = layout::list_json_files(&self.layout.entries_dir()).await?;
        Ok(names
            .into_iter()
            .filter(|n| layout::is_entry_file_name(n))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::page;

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::new(CacheLayout::new(dir.path()));
        let entry = CacheEntry::new(page("https://example.com/", 92.0, 88.0), "sitemap.xml");

        let file_name = store.save(&entry).await.unwrap();
        assert_eq!(file_name, layout::entry_file_name("https://example.com/"));
        assert!(dir.path().join("urls").join(&file_name).is_file());

        let loaded = store.load("https://example.com/").await.unwrap();
        assert_eq!(loaded, entry);
        assert_eq!(store.load_file(&file_name).await.unwrap(), entry);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::new(CacheLayout::new(dir.path()));

        store
            .save(&CacheEntry::new(page("https://example.com/", 40.0, 40.0), "a"))
            .await
            .unwrap();
        store
            .save(&CacheEntry::new(page("https://example.com/", 99.0, 98.0), "b"))
            .await
            .unwrap();

        let loaded = store.load("https://example.com/").await.unwrap();
        assert_eq!(loaded.sitemap, "b");
        assert_eq!(loaded.result.performance_score(), 99.0);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::new(CacheLayout::new(dir.path()));
        let err = store.load("https://example.com/missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_load_corrupt_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path());
        let store = EntryStore::new(layout.clone());
        let file_name = layout::entry_file_name("https://example.com/");
        std::fs::create_dir_all(layout.entries_dir()).unwrap();
        std::fs::write(layout.entry_path(&file_name), r#"{"url": 5}"#).unwrap();

        let err = store.load("https://example.com/").await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn test_remove_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::new(CacheLayout::new(dir.path()));
        let file_name = store
            .save(&CacheEntry::new(page("https://example.com/", 90.0, 90.0), "s"))
            .await
            .unwrap();

        assert!(store.exists(&file_name).await);
        assert!(store.size(&file_name).await > 0);
        assert!(store.remove_file(&file_name).await.unwrap());
        assert!(!store.exists(&file_name).await);
        assert!(!store.remove_file(&file_name).await.unwrap());
    }
}
