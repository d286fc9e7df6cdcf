//! Remote scoring collaborator.

use std::sync::Arc;

use sitescore_core::{ScoreResult, Strategy};

/// Scores one URL for one device strategy.
///
/// Implementations report remote failures through `ScoreResult::error`
/// instead of failing the call, and own any timeout or retry policy.
#[async_trait::async_trait]
pub trait ScoreFetcher: Send + Sync {
    async fn fetch(&self, url: &str, strategy: Strategy) -> ScoreResult;
}

#[async_trait::async_trait]
impl<T: ScoreFetcher + ?Sized> ScoreFetcher for Arc<T> {
    async fn fetch(&self, url: &str, strategy: Strategy) -> ScoreResult {
        (**self).fetch(url, strategy).await
    }
}
