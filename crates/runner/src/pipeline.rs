//! Lookup, score misses, save, combine.

use sitescore_core::{CacheCoordinator, Error, PageResult, SitemapSource, Ttl};

use crate::batch::BatchRunner;
use crate::combine::combine_results;

/// Outcome of one cached analysis run.
#[derive(Debug)]
pub struct Analysis {
    /// Cached and freshly scored pages, in unspecified order.
    pub results: Vec<PageResult>,
    pub cached_count: usize,
    pub fetched_count: usize,
    /// Cache hits older than half the TTL.
    pub stale_urls: Vec<String>,
    /// First cache failure of the run, if any. Results are complete regardless.
    pub cache_error: Option<Error>,
}

/// Score `urls`, reusing cached results and caching whatever is fetched.
///
/// Cache failures never lose results: a failed lookup scores every URL and a
/// failed save still returns what was scored.
pub async fn analyze(
    coordinator: &CacheCoordinator, runner: &BatchRunner, source: &SitemapSource, urls: &[String], ttl: Ttl,
) -> Analysis {
    let mut cache_error = None;

    let (cached, missing, stale_urls) = match coordinator.lookup(source, urls, ttl).await {
        Ok(outcome) => {
            let stale = outcome.stale_urls();
            let (cached, missing) = outcome.into_results();
            (cached, missing, stale)
        }
        Err(e) => {
            tracing::warn!(sitemap = %source.label(), error = %e, "cache lookup failed, scoring every url");
            cache_error = Some(e);
            (Vec::new(), urls.to_vec(), Vec::new())
        }
    };

    tracing::info!(cached = cached.len(), missing = missing.len(), stale = stale_urls.len(), "cache partition");

    let fresh = if missing.is_empty() { Vec::new() } else { runner.run(&missing).await };

    if !fresh.is_empty()
        && let Err(e) = coordinator.save(source, urls, &fresh).await
    {
        tracing::error!(sitemap = %source.label(), error = %e, "failed to cache results");
        cache_error.get_or_insert(e);
    }

    let cached_count = cached.len();
    let fetched_count = fresh.len();

    Analysis { results: combine_results(cached, fresh), cached_count, fetched_count, stale_urls, cache_error }
}
