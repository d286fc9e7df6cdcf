//! Sitemap index files.
//!
//! An index maps every URL cached for one sitemap digest to the entry file
//! holding its result. Saves replace the whole file; there is no merge, so
//! two processes saving the same digest race and the last write wins.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::layout::{self, CacheLayout};
use crate::Error;

/// URL to entry-file mapping for one sitemap digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapIndex {
    pub sitemap_url: String,
    pub sitemap_hash: String,
    #[serde(default)]
    pub urls: BTreeMap<String, String>,
    pub last_updated: DateTime<Utc>,
}

impl SitemapIndex {
    pub fn new(sitemap_url: impl Into<String>, sitemap_hash: impl Into<String>) -> Self {
        Self {
            sitemap_url: sitemap_url.into(),
            sitemap_hash: sitemap_hash.into(),
            urls: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn entry_file(&self, url: &str) -> Option<&str> {
        self.urls.get(url).map(String::as_str)
    }
}

/// Reads and writes index files under `<root>/indexes/`.
#[derive(Debug, Clone)]
pub struct IndexStore {
    layout: CacheLayout,
}

impl IndexStore {
    pub fn new(layout: CacheLayout) -> Self {
        Self { layout }
    }

    /// Load the index for `sitemap_hash`.
    ///
    /// A missing file is `Ok(None)`: nothing has been cached for this content yet.
    pub async fn load(&self, sitemap_hash: &str) -> Result<Option<SitemapIndex>, Error> {
        self.load_file(&layout::index_file_name(sitemap_hash)).await
    }

    pub async fn load_file(&self, file_name: &str) -> Result<Option<SitemapIndex>, Error> {
        match layout::read_json(&self.layout.indexes_dir().join(file_name)).await {
            Ok(index) => Ok(Some(index)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replace the index file, stamping `last_updated` with the current time.
    pub async fn save(&self, index: &mut SitemapIndex) -> Result<(), Error> {
        index.last_updated = Utc::now();
        layout::write_json(&self.layout.index_path(&index.sitemap_hash), index).await?;
        Ok(())
    }

    pub async fn remove(&self, sitemap_hash: &str) -> Result<bool, Error> {
        layout::remove_file(&self.layout.index_path(sitemap_hash)).await
    }

    pub async fn size(&self, sitemap_hash: &str) -> u64 {
        layout::file_size(&self.layout.index_path(sitemap_hash)).await
    }

    /// All index file names currently on disk.
    pub async fn list(&self) -> Result<Vec<String>, Error> {
        let names = layout::list_json_files(&self.layout.indexes_dir()).await?;
        Ok(names
            .into_iter()
            .filter(|n| layout::sitemap_hash_from_file_name(n).is_some())
            .collect())
    }
}
