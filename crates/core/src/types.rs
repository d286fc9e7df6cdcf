//! Score and page result types.
//!
//! A [`ScoreResult`] is produced by the remote scoring collaborator for one
//! URL and one [`Strategy`]. A [`PageResult`] pairs the mobile and desktop
//! passes for one URL and is the unit the cache persists.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Performance scores below this are reported as errors in cache details.
pub const POOR_SCORE_THRESHOLD: f64 = 50.0;

/// Device strategy for one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Mobile,
    Desktop,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mobile => "mobile",
            Strategy::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lighthouse category scores, each in 0-100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub performance: f64,
    pub accessibility: f64,
    pub best_practices: f64,
    pub seo: f64,
}

/// Core Web Vitals and related lab metrics.
///
/// Timings are in milliseconds, `cumulative_layout_shift` is unitless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub first_contentful_paint: f64,
    pub largest_contentful_paint: f64,
    pub first_input_delay: f64,
    pub cumulative_layout_shift: f64,
    pub speed_index: f64,
    pub time_to_interactive: f64,
    pub total_blocking_time: f64,
    pub dom_size: f64,
    pub resource_count: u64,
    pub transfer_size: u64,
}

/// Result of one scoring pass for one URL.
///
/// Remote failures are carried in `error` rather than returned as `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<CategoryScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "duration_ms", default)]
    pub elapsed: Duration,
}

impl ScoreResult {
    /// A successful pass with the given scores.
    pub fn scored(url: impl Into<String>, strategy: Strategy, scores: CategoryScores, elapsed: Duration) -> Self {
        Self { url: url.into(), final_url: None, strategy, scores: Some(scores), metrics: None, error: None, elapsed }
    }

    /// A failed pass carrying its cause.
    pub fn failed(url: impl Into<String>, strategy: Strategy, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            strategy,
            scores: None,
            metrics: None,
            error: Some(error.into()),
            elapsed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn performance(&self) -> Option<f64> {
        self.scores.as_ref().map(|s| s.performance)
    }
}

/// Mobile and desktop results for one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    #[serde(default)]
    pub mobile: Option<ScoreResult>,
    #[serde(default)]
    pub desktop: Option<ScoreResult>,
    #[serde(with = "duration_ms", default)]
    pub duration: Duration,
}

impl PageResult {
    fn devices(&self) -> impl Iterator<Item = &ScoreResult> {
        self.mobile.iter().chain(self.desktop.iter())
    }

    /// At least one present device pass finished without error.
    pub fn is_successful(&self) -> bool {
        self.devices().any(ScoreResult::is_ok)
    }

    /// Mobile performance when positive, otherwise desktop, otherwise 0.
    pub fn performance_score(&self) -> f64 {
        if let Some(score) = self.mobile.as_ref().and_then(ScoreResult::performance)
            && score > 0.0
        {
            return score;
        }
        self.desktop
            .as_ref()
            .and_then(ScoreResult::performance)
            .unwrap_or(0.0)
    }

    /// Any device error, no scores at all, or a poor performance score.
    pub fn has_errors(&self) -> bool {
        if self.devices().any(|r| !r.is_ok()) {
            return true;
        }

        let mut scored = false;
        for score in self.devices().filter_map(ScoreResult::performance) {
            scored = true;
            if score < POOR_SCORE_THRESHOLD {
                return true;
            }
        }
        !scored
    }
}

/// Serialize a `Duration` as integer milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u128::from(u64::MAX)) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
