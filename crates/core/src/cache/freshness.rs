//! TTL handling and freshness classification.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Age classification of a cache entry relative to a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Valid,
    /// Older than half the TTL; still served.
    Stale,
    /// Older than the TTL; never served.
    Expired,
}

impl Freshness {
    /// Valid and stale entries are both cache hits.
    pub fn is_usable(&self) -> bool {
        !matches!(self, Freshness::Expired)
    }
}

/// Cache time-to-live. `None` never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ttl(Option<TimeDelta>);

impl Ttl {
    pub fn never() -> Self {
        Ttl(None)
    }

    /// Hours `<= 0` never expire. Counts too large for `TimeDelta` saturate.
    pub fn from_hours(hours: i64) -> Self {
        if hours <= 0 {
            return Ttl(None);
        }
        Ttl(Some(TimeDelta::try_hours(hours).unwrap_or(TimeDelta::MAX)))
    }

    /// Non-positive durations never expire.
    pub fn from_delta(delta: TimeDelta) -> Self {
        if delta <= TimeDelta::zero() { Ttl(None) } else { Ttl(Some(delta)) }
    }

    pub fn expires(&self) -> bool {
        self.0.is_some()
    }

    pub fn as_delta(&self) -> Option<TimeDelta> {
        self.0
    }

    /// Expired when `age > ttl`, stale when `age > ttl / 2`.
    pub fn classify(&self, age: TimeDelta) -> Freshness {
        let Some(ttl) = self.0 else {
            return Freshness::Valid;
        };
        if age > ttl {
            Freshness::Expired
        } else if age > ttl / 2 {
            Freshness::Stale
        } else {
            Freshness::Valid
        }
    }

    pub fn classify_at(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Freshness {
        self.classify(now.signed_duration_since(timestamp))
    }
}
