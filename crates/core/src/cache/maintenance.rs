//! Cache inspection and cleanup.
//!
//! These run over the whole cache root rather than one sitemap, and are the
//! only place expired entries are removed outside of lookup.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::coordinator::CacheCoordinator;
use super::freshness::{Freshness, Ttl};
use super::layout;
use crate::Error;

const SHORT_HASH_LEN: usize = 8;

/// Summary of one sitemap index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapCacheInfo {
    pub filename: String,
    pub hash: String,
    pub full_hash: String,
    pub sitemap_url: String,
    pub timestamp: DateTime<Utc>,
    pub age: String,
    pub is_expired: bool,
    pub url_count: usize,
    pub valid_count: usize,
    pub stale_count: usize,
    pub expired_count: usize,
    /// Mappings whose entry file is absent or unreadable.
    pub missing_count: usize,
    pub total_size: u64,
    pub avg_score: f64,
}

/// Detail for one cached URL of a sitemap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlCacheDetail {
    pub url: String,
    pub age: String,
    pub is_expired: bool,
    pub is_stale: bool,
    pub performance_score: f64,
    pub cache_size: u64,
    pub timestamp: DateTime<Utc>,
    pub has_errors: bool,
}

/// Counts from [`CacheCoordinator::clean_expired`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    pub removed_entries: usize,
    pub pruned_mappings: usize,
    pub removed_indexes: usize,
    pub dry_run: bool,
}

impl CacheCoordinator {
    /// Summaries of every readable sitemap index, newest first.
    pub async fn list_sitemaps(&self, ttl: Ttl) -> Result<Vec<SitemapCacheInfo>, Error> {
        let now = Utc::now();
        let mut infos = Vec::new();

        for filename in self.indexes.list().await? {
            let index = match self.indexes.load_file(&filename).await {
                Ok(Some(index)) => index,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(filename = %filename, error = %e, "skipping unreadable sitemap index");
                    continue;
                }
            };

            let full_hash = layout::sitemap_hash_from_file_name(&filename)
                .unwrap_or(index.sitemap_hash.as_str())
                .to_string();

            let mut info = SitemapCacheInfo {
                hash: full_hash.chars().take(SHORT_HASH_LEN).collect(),
                filename,
                sitemap_url: index.sitemap_url.clone(),
                timestamp: index.last_updated,
                age: format_age(now.signed_duration_since(index.last_updated)),
                is_expired: ttl.classify_at(index.last_updated, now) == Freshness::Expired,
                url_count: index.urls.len(),
                valid_count: 0,
                stale_count: 0,
                expired_count: 0,
                missing_count: 0,
                total_size: self.indexes.size(&full_hash).await,
                avg_score: 0.0,
                full_hash,
            };

            let mut score_sum = 0.0;
            let mut scored = 0usize;
            for file_name in index.urls.values() {
                if !layout::is_entry_file_name(file_name) {
                    info.missing_count += 1;
                    continue;
                }
                let Ok(entry) = self.entries.load_file(file_name).await else {
                    info.missing_count += 1;
                    continue;
                };
                match ttl.classify_at(entry.timestamp, now) {
                    Freshness::Valid => info.valid_count += 1,
                    Freshness::Stale => info.stale_count += 1,
                    Freshness::Expired => info.expired_count += 1,
                }
                info.total_size += self.entries.size(file_name).await;

                let score = entry.result.performance_score();
                if score > 0.0 {
                    score_sum += score;
                    scored += 1;
                }
            }
            if scored > 0 {
                info.avg_score = score_sum / scored as f64;
            }

            infos.push(info);
        }

        infos.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(infos)
    }

    /// Per-URL details for the index with `sitemap_hash`, sorted by URL.
    ///
    /// An absent index yields an empty list.
    pub async fn url_details(&self, sitemap_hash: &str, ttl: Ttl) -> Result<Vec<UrlCacheDetail>, Error> {
        let Some(index) = self.indexes.load(sitemap_hash).await? else {
            return Ok(Vec::new());
        };

        let now = Utc::now();
        let mut details = Vec::with_capacity(index.urls.len());
        for (url, file_name) in &index.urls {
            if !layout::is_entry_file_name(file_name) {
                continue;
            }
            let Ok(entry) = self.entries.load_file(file_name).await else {
                continue;
            };
            let freshness = ttl.classify_at(entry.timestamp, now);
            details.push(UrlCacheDetail {
                url: url.clone(),
                age: format_age(now.signed_duration_since(entry.timestamp)),
                is_expired: freshness == Freshness::Expired,
                is_stale: freshness == Freshness::Stale,
                performance_score: entry.result.performance_score(),
                cache_size: self.entries.size(file_name).await,
                timestamp: entry.timestamp,
                has_errors: entry.result.has_errors(),
            });
        }
        Ok(details)
    }

    /// Remove expired or undecodable entries, then prune indexes to match.
    ///
    /// Requires a TTL that expires; the check happens before any I/O.
    pub async fn clean_expired(&self, ttl: Ttl, dry_run: bool) -> Result<CleanReport, Error> {
        if !ttl.expires() {
            return Err(Error::InvalidConfig("cache clean requires a positive TTL".into()));
        }

        let now = Utc::now();
        let mut report = CleanReport { dry_run, ..Default::default() };
        let mut removed = HashSet::new();

        for file_name in self.entries.list().await? {
            let expired = match self.entries.load_file(&file_name).await {
                Ok(entry) => ttl.classify_at(entry.timestamp, now) == Freshness::Expired,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    tracing::warn!(file_name = %file_name, error = %e, "removing unreadable cache entry");
                    true
                }
            };
            if !expired {
                continue;
            }
            if !dry_run {
                self.entries.remove_file(&file_name).await?;
            }
            report.removed_entries += 1;
            removed.insert(file_name);
        }

        for filename in self.indexes.list().await? {
            let Some(hash) = layout::sitemap_hash_from_file_name(&filename) else {
                continue;
            };
            let mut index = match self.indexes.load_file(&filename).await {
                Ok(Some(index)) => index,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(filename = %filename, error = %e, "skipping unreadable sitemap index");
                    continue;
                }
            };

            let mut dangling = Vec::new();
            for (url, file_name) in &index.urls {
                let gone = removed.contains(file_name)
                    || !layout::is_entry_file_name(file_name)
                    || !self.entries.exists(file_name).await;
                if gone {
                    dangling.push(url.clone());
                }
            }
            if dangling.is_empty() {
                continue;
            }

            report.pruned_mappings += dangling.len();
            for url in &dangling {
                index.urls.remove(url);
            }

            if index.urls.is_empty() {
                report.removed_indexes += 1;
                if !dry_run {
                    self.indexes.remove(hash).await?;
                }
            } else if !dry_run {
                index.sitemap_hash = hash.to_string();
                self.indexes.save(&mut index).await?;
            }
        }

        tracing::info!(
            removed_entries = report.removed_entries,
            pruned_mappings = report.pruned_mappings,
            removed_indexes = report.removed_indexes,
            dry_run,
            "cache clean complete"
        );
        Ok(report)
    }

    /// Remove every index and entry file. Returns the number removed.
    pub async fn clear_all(&self) -> Result<usize, Error> {
        let mut cleared = 0;
        for dir in [self.layout.indexes_dir(), self.layout.entries_dir()] {
            for name in layout::list_json_files(&dir).await? {
                if layout::remove_file(&dir.join(&name)).await? {
                    cleared += 1;
                }
            }
        }
        tracing::info!(cleared, "cache cleared");
        Ok(cleared)
    }

    /// Entry files that no index references.
    pub async fn orphaned_entries(&self) -> Result<Vec<String>, Error> {
        let mut referenced = HashSet::new();
        for filename in self.indexes.list().await? {
            if let Ok(Some(index)) = self.indexes.load_file(&filename).await {
                referenced.extend(index.urls.into_values());
            }
        }

        Ok(self
            .entries
            .list()
            .await?
            .into_iter()
            .filter(|name| !referenced.contains(name))
            .collect())
    }
}

/// Render an age as minutes under an hour, hours under a day, days otherwise.
pub fn format_age(age: TimeDelta) -> String {
    let minutes = age.num_seconds().max(0) as f64 / 60.0;
    if minutes < 60.0 {
        format!("{minutes:.0}m")
    } else if minutes < 24.0 * 60.0 {
        format!("{:.1}h", minutes / 60.0)
    } else {
        format!("{:.1}d", minutes / (24.0 * 60.0))
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < 5 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let unit = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {unit}B", bytes as f64 / div as f64)
}
