//! File-backed, content-addressed URL cache.
//!
//! This module persists page results as JSON files so repeated runs skip
//! URLs that were scored recently. It supports:
//!
//! - Sitemap indexes keyed by a SHA-256 digest of the sitemap content
//! - Per-URL entries keyed by a SHA-256 digest of the URL, shared across sitemaps
//! - TTL-based freshness (valid, stale, expired) with eviction on lookup
//! - Crash-safe writes via temp file and rename
//! - Maintenance: listing, cleaning expired entries, clearing everything

pub mod coordinator;
pub mod entries;
pub mod freshness;
pub mod hash;
pub mod index;
pub mod layout;
pub mod maintenance;

pub use crate::Error;

pub use coordinator::{CacheCoordinator, CachedPage, LookupOutcome};
pub use entries::{CacheEntry, EntryStore};
pub use freshness::{Freshness, Ttl};
pub use hash::{SitemapSource, hash_url_list, sitemap_digest, url_digest};
pub use index::{IndexStore, SitemapIndex};
pub use layout::CacheLayout;
pub use maintenance::{CleanReport, SitemapCacheInfo, UrlCacheDetail, format_age, format_bytes};
