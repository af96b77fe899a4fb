//! Write throttling for both sinks.
//!
//! Long-lived processes keep the last write time in memory. Stateless
//! processes start cold on every request, so they consult the marker cell on
//! the remote sheet instead.

use crate::remote::RemoteSession;
use chrono::{DateTime, Utc};
use std::time::Duration;
use vote_tracker_core::PairBaseline;

/// In-memory write timer plus the baseline of the last handed-off row.
#[derive(Debug, Clone)]
pub struct PersistenceThrottle {
    interval: Duration,
    last_write_at: Option<DateTime<Utc>>,
    baseline: Option<PairBaseline>,
}

impl PersistenceThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_write_at: None,
            baseline: None,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when nothing was written yet or the interval has elapsed.
    #[must_use]
    pub fn should_write_local(&self, now: DateTime<Utc>) -> bool {
        match self.last_write_at {
            None => true,
            Some(last) => elapsed(last, now) >= self.interval,
        }
    }

    /// Records a row handed to the sinks at `now`.
    pub fn record_write(&mut self, now: DateTime<Utc>, baseline: PairBaseline) {
        self.last_write_at = Some(now);
        self.baseline = Some(baseline);
    }

    #[must_use]
    pub fn baseline(&self) -> Option<PairBaseline> {
        self.baseline
    }

    #[must_use]
    pub fn last_write_at(&self) -> Option<DateTime<Utc>> {
        self.last_write_at
    }
}

fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

/// Parses the marker cell as unix seconds. Thousands separators are ignored.
#[must_use]
pub fn parse_marker(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    cleaned.parse().ok()
}

/// Decides whether a stateless process should write the remote sheet.
///
/// Any doubt (no sheet, unreadable or unparseable marker) allows the write;
/// the minute dedup still guards against duplicates.
pub async fn should_write_remote(session: &RemoteSession, interval: Duration, now: DateTime<Utc>) -> bool {
    let sheet = match session.sheet().await {
        Ok(sheet) => sheet,
        Err(e) => {
            tracing::debug!(error = %e, "Marker check skipped, remote sheet unavailable");
            return true;
        }
    };

    let raw = match sheet.read_marker().await {
        Ok(Some(raw)) => raw,
        Ok(None) => return true,
        Err(e) => {
            tracing::warn!(error = %e, "Marker read failed, allowing write");
            return true;
        }
    };

    let Some(last) = parse_marker(&raw) else {
        return true;
    };
    let now_secs = now.timestamp() as f64;
    now_secs - last >= interval.as_secs_f64()
}
