//! Cache freshness policy.
//!
//! Decides whether a stored record can be served as-is and how long
//! downstream caches may keep it. Both answers are derived from the same
//! `last_modified` timestamp so the client-facing cache directive never
//! outlives the server-side policy.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default maximum age of a cached record (7 days).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Freshness of a stored record at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessVerdict {
    /// Within max age, serve without refetching.
    Fresh,
    /// Older than max age, serve and refresh in the background.
    Stale,
    /// Nothing stored.
    Absent,
}

/// Evaluate the freshness of a record last written at `last_modified`.
///
/// A `last_modified` in the future (clock skew) counts as zero elapsed time.
pub fn evaluate(
    now: DateTime<Utc>,
    last_modified: Option<DateTime<Utc>>,
    max_age: Duration,
) -> FreshnessVerdict {
    match last_modified {
        None => FreshnessVerdict::Absent,
        Some(last_modified) if elapsed(now, last_modified) <= max_age => FreshnessVerdict::Fresh,
        Some(_) => FreshnessVerdict::Stale,
    }
}

/// Time left until a record written at `last_modified` becomes stale.
///
/// Rounded up to the next whole second and clamped to `[0, max_age]`.
pub fn remaining_ttl(
    now: DateTime<Utc>,
    last_modified: DateTime<Utc>,
    max_age: Duration,
) -> Duration {
    let remaining = max_age.saturating_sub(elapsed(now, last_modified));
    round_up_to_secs(remaining).min(max_age)
}

/// Render a TTL as a `Cache-Control` header value.
pub fn cache_control_value(ttl: Duration) -> String {
    format!("public, max-age={}", ttl.as_secs())
}

fn elapsed(now: DateTime<Utc>, last_modified: DateTime<Utc>) -> Duration {
    (now - last_modified).to_std().unwrap_or(Duration::ZERO)
}

fn round_up_to_secs(duration: Duration) -> Duration {
    if duration.subsec_nanos() == 0 {
        duration
    } else {
        Duration::from_secs(duration.as_secs().saturating_add(1))
    }
}

/// Freshness policy bound to a configured maximum age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    max_age: Duration,
}

impl FreshnessPolicy {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn evaluate(
        &self,
        now: DateTime<Utc>,
        last_modified: Option<DateTime<Utc>>,
    ) -> FreshnessVerdict {
        evaluate(now, last_modified, self.max_age)
    }

    pub fn remaining_ttl(&self, now: DateTime<Utc>, last_modified: DateTime<Utc>) -> Duration {
        remaining_ttl(now, last_modified, self.max_age)
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}
