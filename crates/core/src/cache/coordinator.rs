//! Lookup and save protocol across sitemap indexes and entry files.
//!
//! Lookup resolves each URL through the index for the sitemap digest, then
//! classifies the entry against the TTL. Save writes every entry before the
//! index so a crash can only leave orphaned entries, never an index that
//! points at files that were not written.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use super::entries::{CacheEntry, EntryStore};
use super::freshness::{Freshness, Ttl};
use super::hash::{SitemapSource, sitemap_digest};
use super::index::{IndexStore, SitemapIndex};
use super::layout::{self, CacheLayout};
use crate::{AppConfig, Error, PageResult};

/// A cache hit.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    pub result: PageResult,
    pub freshness: Freshness,
    pub cached_at: DateTime<Utc>,
}

/// Partition of requested URLs into hits and misses.
#[derive(Debug, Clone, Default)]
pub struct LookupOutcome {
    pub sitemap_hash: String,
    pub cached: Vec<CachedPage>,
    /// Misses, in the caller's order.
    pub missing: Vec<String>,
}

impl LookupOutcome {
    pub fn stale_urls(&self) -> Vec<String> {
        self.cached
            .iter()
            .filter(|c| c.freshness == Freshness::Stale)
            .map(|c| c.result.url.clone())
            .collect()
    }

    pub fn into_results(self) -> (Vec<PageResult>, Vec<String>) {
        (self.cached.into_iter().map(|c| c.result).collect(), self.missing)
    }
}

/// File-backed URL cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct CacheCoordinator {
    pub(crate) layout: CacheLayout,
    pub(crate) entries: EntryStore,
    pub(crate) indexes: IndexStore,
    evict_on_lookup: bool,
}

impl CacheCoordinator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let layout = CacheLayout::new(root);
        Self {
            entries: EntryStore::new(layout.clone()),
            indexes: IndexStore::new(layout.clone()),
            layout,
            evict_on_lookup: true,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.cache_dir.clone()).with_eviction(config.evict_expired_on_lookup)
    }

    /// Whether lookup deletes expired entry files it encounters.
    pub fn with_eviction(mut self, evict_on_lookup: bool) -> Self {
        self.evict_on_lookup = evict_on_lookup;
        self
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    pub fn indexes(&self) -> &IndexStore {
        &self.indexes
    }

    /// Split `urls` into cached results and URLs that need fetching.
    ///
    /// Unreadable index or entry files count as misses. Expired entries are
    /// misses and, when eviction is enabled, their files are removed. Dangling
    /// index mappings are left in place.
    pub async fn lookup(&self, source: &SitemapSource, urls: &[String], ttl: Ttl) -> Result<LookupOutcome, Error> {
        let sitemap_hash = sitemap_digest(source, urls).await?;

        let index = match self.indexes.load(&sitemap_hash).await {
            Ok(index) => index.filter(|index| matches_digest(index, &sitemap_hash)),
            Err(e) => {
                tracing::warn!(sitemap_hash = %sitemap_hash, error = %e, "unreadable sitemap index, treating as empty");
                None
            }
        };

        let Some(index) = index else {
            tracing::debug!(sitemap_hash = %sitemap_hash, urls = urls.len(), "no sitemap index");
            return Ok(LookupOutcome { sitemap_hash, cached: Vec::new(), missing: urls.to_vec() });
        };

        let now = Utc::now();
        let mut cached = Vec::new();
        let mut missing = Vec::new();

        for url in urls {
            match self.lookup_entry(&index, url, ttl, now).await {
                Some(hit) => cached.push(hit),
                None => missing.push(url.clone()),
            }
        }

        tracing::debug!(
            sitemap_hash = %sitemap_hash,
            cached = cached.len(),
            missing = missing.len(),
            "cache lookup complete"
        );

        Ok(LookupOutcome { sitemap_hash, cached, missing })
    }

    async fn lookup_entry(&self, index: &SitemapIndex, url: &str, ttl: Ttl, now: DateTime<Utc>) -> Option<CachedPage> {
        let file_name = index.entry_file(url)?;
        if !layout::is_entry_file_name(file_name) {
            tracing::warn!(url, file_name, "ignoring malformed index mapping");
            return None;
        }

        let entry = match self.entries.load_file(file_name).await {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => {
                tracing::debug!(url, file_name, "dangling index mapping");
                return None;
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "unreadable cache entry, treating as miss");
                return None;
            }
        };

        if entry.url != url {
            tracing::warn!(url, stored = %entry.url, "cache entry belongs to a different url");
            return None;
        }

        let freshness = ttl.classify_at(entry.timestamp, now);
        if freshness == Freshness::Expired {
            tracing::debug!(url, cached_at = %entry.timestamp, "cache entry expired");
            if self.evict_on_lookup
                && let Err(e) = self.entries.remove_file(file_name).await
            {
                tracing::warn!(url, error = %e, "failed to remove expired cache entry");
            }
            return None;
        }

        Some(CachedPage { result: entry.result, freshness, cached_at: entry.timestamp })
    }

    /// Persist `fresh` results and record them in the index for this sitemap.
    ///
    /// `source` and `all_urls` must be what was passed to [`lookup`](Self::lookup)
    /// so both agree on the index file. Returns the number of entries written.
    /// Writes already made are kept if a later one fails.
    pub async fn save(&self, source: &SitemapSource, all_urls: &[String], fresh: &[PageResult]) -> Result<usize, Error> {
        let sitemap_hash = sitemap_digest(source, all_urls).await?;
        let label = source.label();

        let mut index = match self.indexes.load(&sitemap_hash).await {
            Ok(Some(index)) if matches_digest(&index, &sitemap_hash) => index,
            Ok(_) => SitemapIndex::new(label.clone(), sitemap_hash.clone()),
            Err(e @ Error::Decode { .. }) => {
                tracing::warn!(sitemap_hash = %sitemap_hash, error = %e, "replacing unreadable sitemap index");
                SitemapIndex::new(label.clone(), sitemap_hash.clone())
            }
            Err(e) => return Err(e),
        };
        index.sitemap_url = label.clone();

        for result in fresh {
            let entry = CacheEntry::new(result.clone(), label.clone());
            let file_name = self.entries.save(&entry).await?;
            index.urls.insert(result.url.clone(), file_name);
        }

        self.indexes.save(&mut index).await?;

        tracing::info!(sitemap_hash = %sitemap_hash, saved = fresh.len(), indexed = index.urls.len(), "cache saved");
        Ok(fresh.len())
    }
}

/// An index whose recorded digest differs from its file name is ignored.
fn matches_digest(index: &SitemapIndex, sitemap_hash: &str) -> bool {
    if index.sitemap_hash == sitemap_hash {
        return true;
    }
    tracing::warn!(sitemap_hash, recorded = %index.sitemap_hash, "sitemap index digest mismatch, treating as absent");
    false
}
