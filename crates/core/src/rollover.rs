//! Day-boundary rollover detection in a fixed timezone.
//!
//! The rollover timezone (KST by default) differs from the snapshot timezone
//! (+07:00 by default). When the rollover-zone date changes, the leader and
//! runner-up of the *current* live tally are captured as the previous day's
//! result. This is a snapshot at detection time, not an end-of-day
//! reconciliation: its accuracy depends on the poll cadence.
//!
//! # States
//!
//! ```text
//! Uninitialized --first check--> Tracking --date changed--> RolledOver
//!                                    ^                          |
//!                                    +-------- same date -------+
//! ```

use crate::models::{Candidate, PreviousDayFact};
use crate::time::parse_time_label;
use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeZone};
use serde::Serialize;

/// Runner-up name used when only one candidate exists.
pub const MISSING_RUNNER_UP: &str = "N/A";

/// Rollover detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RolloverState {
    /// No date recorded yet.
    Uninitialized,
    /// Watching `date` for a change.
    Tracking { date: NaiveDate },
    /// A fact was emitted; now watching `date`.
    RolledOver { date: NaiveDate },
}

impl RolloverState {
    /// Date currently being watched.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Uninitialized => None,
            Self::Tracking { date } | Self::RolledOver { date } => Some(*date),
        }
    }
}

/// Detects rollover-zone date changes and produces [`PreviousDayFact`]s.
#[derive(Debug, Clone)]
pub struct DayRolloverTracker {
    rollover_offset: FixedOffset,
    snapshot_offset: FixedOffset,
    state: RolloverState,
}

impl DayRolloverTracker {
    pub fn new(rollover_offset: FixedOffset, snapshot_offset: FixedOffset) -> Self {
        Self {
            rollover_offset,
            snapshot_offset,
            state: RolloverState::Uninitialized,
        }
    }

    #[must_use]
    pub fn state(&self) -> RolloverState {
        self.state
    }

    /// Rollover-zone calendar date of `now`.
    #[must_use]
    pub fn date_of<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> NaiveDate {
        now.with_timezone(&self.rollover_offset).date_naive()
    }

    /// Checks for a date change at `now` against the live `candidates`.
    ///
    /// The first call only records today's date. A later call on a new date
    /// returns the fact for the date that just ended, or `None` when there are
    /// no candidates to rank; the watched date advances either way.
    pub fn check_day_change<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
        candidates: &[Candidate],
    ) -> Option<PreviousDayFact> {
        let today = self.date_of(now);

        let Some(stored) = self.state.date() else {
            self.state = RolloverState::Tracking { date: today };
            return None;
        };

        if stored == today {
            return None;
        }

        let fact = rank(candidates).map(|(winner, runner_up)| {
            let (runner_up_name, runner_up_votes) = runner_up
                .map(|c| (c.tracking_name(), c.votes))
                .unwrap_or((MISSING_RUNNER_UP, 0));
            PreviousDayFact::new(stored, winner.tracking_name(), winner.votes, runner_up_name, runner_up_votes)
        });

        match &fact {
            Some(f) => tracing::info!(
                today = %today,
                ended = %stored,
                winner = f.winner_name.as_deref().unwrap_or_default(),
                diff = f.diff,
                "Rollover day changed"
            ),
            None => tracing::info!(today = %today, ended = %stored, "Rollover day changed with no candidates"),
        }

        self.state = if fact.is_some() {
            RolloverState::RolledOver { date: today }
        } else {
            RolloverState::Tracking { date: today }
        };
        fact
    }

    /// Records `today` as the watched date after a cold-start recovery.
    pub fn mark_recovered(&mut self, today: NaiveDate) {
        self.state = RolloverState::Tracking { date: today };
    }

    /// Indices into `labels` of rows that fall on the rollover day before `now`.
    ///
    /// Scans backwards, skipping index 0 (the header) and unparseable labels,
    /// and stops at the first row older than yesterday. Most recent first.
    #[must_use]
    pub fn yesterday_rows<Tz: TimeZone>(&self, labels: &[String], now: &DateTime<Tz>) -> Vec<usize> {
        let Some(yesterday) = self.date_of(now).checked_sub_days(Days::new(1)) else {
            return Vec::new();
        };

        let mut rows = Vec::new();
        for idx in (1..labels.len()).rev() {
            let Some(ts) = parse_time_label(&labels[idx], self.snapshot_offset) else {
                continue;
            };
            let row_date = ts.with_timezone(&self.rollover_offset).date_naive();
            if row_date == yesterday {
                rows.push(idx);
            } else if row_date < yesterday {
                break;
            }
        }
        rows
    }

    /// Yesterday's date in the rollover zone.
    #[must_use]
    pub fn yesterday_of<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<NaiveDate> {
        self.date_of(now).checked_sub_days(Days::new(1))
    }
}

/// Leader and runner-up by votes, ties broken by list order.
#[must_use]
pub fn rank(candidates: &[Candidate]) -> Option<(&Candidate, Option<&Candidate>)> {
    let mut sorted: Vec<&Candidate> = candidates.iter().collect();
    // sort_by is stable, so equal votes keep their upstream order
    sorted.sort_by(|a, b| b.votes.cmp(&a.votes));
    let mut iter = sorted.into_iter();
    let winner = iter.next()?;
    Some((winner, iter.next()))
}
