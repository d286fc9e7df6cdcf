//! Bounded-concurrency batch runner.
//!
//! Each URL is one task holding a semaphore permit for its lifetime, so at
//! most `max_concurrency` URLs are in flight. Every admitted URL issues its
//! mobile and desktop fetches together, so peak network concurrency is twice
//! the URL bound.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use sitescore_core::{AppConfig, PageResult, ScoreResult, Strategy};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

use crate::fetch::ScoreFetcher;

/// Batch progress counters.
///
/// Informational only; no result depends on these values.
#[derive(Debug, Default)]
pub struct Progress {
    total: usize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self { total, ..Default::default() }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of URLs observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Acquire)
    }

    fn start(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);
    }

    fn finish(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.completed.fetch_add(1, Ordering::AcqRel);
    }
}

/// Scores URLs on mobile and desktop with a cap on URLs in flight.
#[derive(Clone)]
pub struct BatchRunner {
    fetcher: Arc<dyn ScoreFetcher>,
    max_concurrency: usize,
    progress_interval: Option<Duration>,
}

impl BatchRunner {
    /// `max_concurrency` is clamped to at least 1.
    pub fn new(fetcher: Arc<dyn ScoreFetcher>, max_concurrency: usize) -> Self {
        Self { fetcher, max_concurrency: max_concurrency.max(1), progress_interval: None }
    }

    pub fn from_config(fetcher: Arc<dyn ScoreFetcher>, config: &AppConfig) -> Self {
        Self::new(fetcher, config.max_workers).with_progress_interval(config.progress_interval())
    }

    /// Log completed/total at this interval while a batch runs. Zero disables it.
    pub fn with_progress_interval(mut self, interval: Option<Duration>) -> Self {
        self.progress_interval = interval.filter(|every| !every.is_zero());
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Score every URL, returning results in input order.
    ///
    /// Returns only after every URL has finished both fetches. Fetch failures
    /// stay inside the individual results.
    pub async fn run(&self, urls: &[String]) -> Vec<PageResult> {
        self.run_with_progress(urls, Arc::new(Progress::new(urls.len())))
            .await
    }

    /// Like [`run`](Self::run), updating `progress` as URLs complete.
    pub async fn run_with_progress(&self, urls: &[String], progress: Arc<Progress>) -> Vec<PageResult> {
        if urls.is_empty() {
            return Vec::new();
        }

        tracing::info!(urls = urls.len(), max_concurrency = self.max_concurrency, "starting batch");
        let started = Instant::now();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let reporter = self
            .progress_interval
            .map(|every| spawn_reporter(progress.clone(), every));

        let mut slots: Vec<Option<PageResult>> = (0..urls.len()).map(|_| None).collect();
        let mut join_set = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(error = %e, "batch semaphore closed");
                    break;
                }
            };
            let fetcher = self.fetcher.clone();
            let progress = progress.clone();
            let url = url.clone();

            join_set.spawn(async move {
                // NOTE: Hold permit for task duration to enforce concurrency limit
                let _permit = permit;
                progress.start();
                let result = score_page(fetcher.as_ref(), url).await;
                progress.finish();
                (index, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "scoring task failed"),
            }
        }

        if let Some(reporter) = reporter {
            reporter.abort();
        }

        let results: Vec<PageResult> = slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| slot.unwrap_or_else(|| unfinished(url)))
            .collect();

        let succeeded = results.iter().filter(|r| r.is_successful()).count();
        tracing::info!(
            urls = results.len(),
            succeeded,
            failed = results.len() - succeeded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch complete"
        );

        results
    }
}

async fn score_page(fetcher: &dyn ScoreFetcher, url: String) -> PageResult {
    tracing::debug!(url = %url, "scoring started");
    let start = Instant::now();

    let (mobile, desktop) = tokio::join!(fetcher.fetch(&url, Strategy::Mobile), fetcher.fetch(&url, Strategy::Desktop));

    let duration = start.elapsed();
    for result in [&mobile, &desktop] {
        if let Some(error) = &result.error {
            tracing::warn!(url = %url, strategy = %result.strategy, error = %error, "scoring failed");
        }
    }
    tracing::debug!(url = %url, duration_ms = duration.as_millis() as u64, "scoring finished");

    PageResult { url, mobile: Some(mobile), desktop: Some(desktop), duration }
}

fn unfinished(url: &str) -> PageResult {
    const REASON: &str = "scoring task did not complete";
    PageResult {
        url: url.to_string(),
        mobile: Some(ScoreResult::failed(url, Strategy::Mobile, REASON, Duration::ZERO)),
        desktop: Some(ScoreResult::failed(url, Strategy::Desktop, REASON, Duration::ZERO)),
        duration: Duration::ZERO,
    }
}

fn spawn_reporter(progress: Arc<Progress>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let done = progress.completed();
            tracing::info!(completed = done, total = progress.total(), "batch progress");
            if done >= progress.total() {
                break;
            }
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sitescore_core::CategoryScores;
    use std::sync::Mutex;

    /// Fetcher that sleeps, records concurrency, and fails on request.
    #[derive(Default)]
    pub(crate) struct MockFetcher {
        pub(crate) active: AtomicUsize,
        pub(crate) peak: AtomicUsize,
        pub(crate) calls: Mutex<Vec<(String, Strategy)>>,
    }

    impl MockFetcher {
        fn delay_for(url: &str) -> Duration {
            // later URLs finish first when a URL ends in a digit
            let digit = url.chars().last().and_then(|c| c.to_digit(10)).unwrap_or(1);
            Duration::from_millis(10 + u64::from(9 - digit.min(9)) * 5)
        }
    }

    #[async_trait::async_trait]
    impl ScoreFetcher for MockFetcher {
        async fn fetch(&self, url: &str, strategy: Strategy) -> ScoreResult {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push((url.to_string(), strategy));

            tokio::time::sleep(Self::delay_for(url)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let fails = (strategy == Strategy::Mobile && url.contains("fail-mobile")) || url.contains("fail-all");
            if fails {
                ScoreResult::failed(url, strategy, "API error: 500", Duration::from_millis(10))
            } else {
                let scores = CategoryScores { performance: 90.0, accessibility: 95.0, best_practices: 100.0, seo: 92.0 };
                ScoreResult::scored(url, strategy, scores, Duration::from_millis(10))
            }
        }
    }

    struct PanickingFetcher;

    #[async_trait::async_trait]
    impl ScoreFetcher for PanickingFetcher {
        async fn fetch(&self, url: &str, strategy: Strategy) -> ScoreResult {
            if url.contains("boom") {
                panic!("fetcher exploded");
            }
            ScoreResult::scored(url, strategy, CategoryScores::default(), Duration::ZERO)
        }
    }

    pub(crate) fn urls(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("https://example.com/page{i}")).collect()
    }

    #[tokio::test]
    async fn test_run_preserves_input_order() {
        let fetcher = Arc::new(MockFetcher::default());
        let runner = BatchRunner::new(fetcher, 3);
        let list = urls(6);

        let results = runner.run(&list).await;
        let got: Vec<_> = results.iter().map(|r| r.url.clone()).collect();
        assert_eq!(got, list);
        for result in &results {
            assert_eq!(result.mobile.as_ref().unwrap().strategy, Strategy::Mobile);
            assert_eq!(result.desktop.as_ref().unwrap().strategy, Strategy::Desktop);
            assert!(result.is_successful());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bound() {
        let fetcher = Arc::new(MockFetcher::default());
        let runner = BatchRunner::new(fetcher.clone(), 2);
        let progress = Arc::new(Progress::new(8));

        let results = runner.run_with_progress(&urls(8), progress.clone()).await;
        assert_eq!(results.len(), 8);
        assert!(progress.peak_in_flight() <= 2);
        assert!(progress.peak_in_flight() >= 1);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(progress.completed(), 8);
        assert_eq!(progress.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_devices_fetched_concurrently() {
        let fetcher = Arc::new(MockFetcher::default());
        let runner = BatchRunner::new(fetcher.clone(), 1);

        let results = runner.run(&urls(3)).await;
        assert_eq!(results.len(), 3);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_abort() {
        let fetcher = Arc::new(MockFetcher::default());
        let runner = BatchRunner::new(fetcher.clone(), 2);
        let list = vec![
            "https://example.com/fail-mobile".to_string(),
            "https://example.com/fail-all".to_string(),
            "https://example.com/ok".to_string(),
        ];

        let results = runner.run(&list).await;
        assert_eq!(results.len(), 3);

        let partial = &results[0];
        assert!(partial.mobile.as_ref().unwrap().error.is_some());
        assert!(partial.desktop.as_ref().unwrap().error.is_none());
        assert!(partial.is_successful());

        assert!(!results[1].is_successful());
        assert!(results[2].is_successful());
        assert_eq!(fetcher.calls.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let runner = BatchRunner::new(Arc::new(MockFetcher::default()), 0);
        assert_eq!(runner.max_concurrency(), 1);
        assert_eq!(runner.run(&urls(2)).await.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let fetcher = Arc::new(MockFetcher::default());
        let runner = BatchRunner::new(fetcher.clone(), 4);
        assert!(runner.run(&[]).await.is_empty());
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_task_yields_failed_result() {
        let runner = BatchRunner::new(Arc::new(PanickingFetcher), 2);
        let list = vec!["https://example.com/fine".to_string(), "https://example.com/boom".to_string()];

        let results = runner.run(&list).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_successful());
        assert_eq!(results[1].url, list[1]);
        assert!(!results[1].is_successful());
    }

    #[tokio::test]
    async fn test_progress_reporter_runs() {
        let runner = BatchRunner::new(Arc::new(MockFetcher::default()), 2)
            .with_progress_interval(Some(Duration::from_millis(5)));
        let progress = Arc::new(Progress::new(4));

        runner.run_with_progress(&urls(4), progress.clone()).await;
        assert_eq!(progress.completed(), 4);
    }

    #[tokio::test]
    async fn test_zero_progress_interval_disables_reporter() {
        let runner = BatchRunner::new(Arc::new(MockFetcher::default()), 2).with_progress_interval(Some(Duration::ZERO));
        assert!(runner.progress_interval.is_none());

        let results = runner.run(&urls(2)).await;
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig { max_workers: 7, progress_interval_ms: 0, ..Default::default() };
        let runner = BatchRunner::from_config(Arc::new(MockFetcher::default()), &config);
        assert_eq!(runner.max_concurrency(), 7);
        assert!(runner.progress_interval.is_none());
    }
}
