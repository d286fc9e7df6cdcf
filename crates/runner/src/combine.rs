//! Merging cache hits with freshly scored pages.

use std::collections::HashMap;

use sitescore_core::PageResult;

/// Merge `cached` and `fresh` keyed by URL, with `fresh` winning on collision.
///
/// Output order is unspecified. Use [`order_like`] when the caller's order
/// matters.
pub fn combine_results(cached: Vec<PageResult>, fresh: Vec<PageResult>) -> Vec<PageResult> {
    if fresh.is_empty() {
        return cached;
    }
    if cached.is_empty() {
        return fresh;
    }

    let mut merged: HashMap<String, PageResult> = HashMap::with_capacity(cached.len() + fresh.len());
    for result in cached.into_iter().chain(fresh) {
        merged.insert(result.url.clone(), result);
    }
    merged.into_values().collect()
}

/// Re-sort `results` into the order of `urls`.
///
/// Results whose URL is not in `urls` keep their relative order at the end.
pub fn order_like(mut results: Vec<PageResult>, urls: &[String]) -> Vec<PageResult> {
    let position: HashMap<&str, usize> = urls
        .iter()
        .enumerate()
        .rev()
        .map(|(i, url)| (url.as_str(), i))
        .collect();

    results.sort_by_key(|r| position.get(r.url.as_str()).copied().unwrap_or(usize::MAX));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitescore_core::{CategoryScores, ScoreResult, Strategy};
    use std::time::Duration;

    fn page(url: &str, performance: f64) -> PageResult {
        let scores = CategoryScores { performance, ..Default::default() };
        PageResult {
            url: url.to_string(),
            mobile: Some(ScoreResult::scored(url, Strategy::Mobile, scores.clone(), Duration::ZERO)),
            desktop: Some(ScoreResult::scored(url, Strategy::Desktop, scores, Duration::ZERO)),
            duration: Duration::from_millis(5),
        }
    }

    fn urls_of(results: &[PageResult]) -> Vec<&str> {
        let mut urls: Vec<_> = results.iter().map(|r| r.url.as_str()).collect();
        urls.sort_unstable();
        urls
    }

    #[test]
    fn test_combine_disjoint() {
        let cached = vec![page("https://e.com/a", 90.0), page("https://e.com/b", 80.0)];
        let fresh = vec![page("https://e.com/c", 70.0)];

        let merged = combine_results(cached, fresh);
        assert_eq!(urls_of(&merged), vec!["https://e.com/a", "https://e.com/b", "https://e.com/c"]);
    }

    #[test]
    fn test_combine_fresh_wins_on_collision() {
        let cached = vec![page("https://e.com/a", 10.0), page("https://e.com/b", 20.0)];
        let fresh = vec![page("https://e.com/a", 99.0)];

        let merged = combine_results(cached, fresh);
        assert_eq!(merged.len(), 2);
        let a = merged.iter().find(|r| r.url == "https://e.com/a").unwrap();
        assert_eq!(a.performance_score(), 99.0);
    }

    #[test]
    fn test_combine_one_side_empty() {
        let only = vec![page("https://e.com/a", 50.0)];
        assert_eq!(combine_results(only.clone(), Vec::new()), only);
        assert_eq!(combine_results(Vec::new(), only.clone()), only);
        assert!(combine_results(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn test_order_like_restores_input_order() {
        let urls: Vec<String> = ["https://e.com/3", "https://e.com/1", "https://e.com/2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let results = vec![page("https://e.com/1", 1.0), page("https://e.com/2", 2.0), page("https://e.com/3", 3.0)];

        let ordered = order_like(results, &urls);
        let got: Vec<_> = ordered.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(got, vec!["https://e.com/3", "https://e.com/1", "https://e.com/2"]);
    }

    #[test]
    fn test_order_like_unknown_urls_go_last() {
        let urls = vec!["https://e.com/b".to_string()];
        let results = vec![page("https://e.com/x", 1.0), page("https://e.com/b", 2.0), page("https://e.com/y", 3.0)];

        let ordered = order_like(results, &urls);
        let got: Vec<_> = ordered.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(got, vec!["https://e.com/b", "https://e.com/x", "https://e.com/y"]);
    }
}
