//! Domain types shared by every crate in the workspace.
//!
//! - [`Candidate`] and [`Snapshot`] describe one reading of the live tally
//! - [`TrackedPair`] selects the two candidates whose head-to-head row is persisted
//! - [`TrackedPairDiff`] is that row, derived at write time
//! - [`PreviousDayFact`] remembers who led when the rollover day ended

use crate::time::time_label;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

// =============================================================================
// Snapshot Types
// =============================================================================

/// One option of the poll with its current vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Opaque upstream option identifier.
    pub id: String,
    /// Display name as returned upstream (may carry stray whitespace).
    pub name: String,
    /// First image URL of the option, empty when absent.
    #[serde(rename = "image")]
    pub image_url: String,
    /// Number of selectors at fetch time.
    pub votes: u64,
}

impl Candidate {
    /// Creates a candidate without an image.
    pub fn new(id: impl Into<String>, name: impl Into<String>, votes: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image_url: String::new(),
            votes,
        }
    }

    /// Name used for identity when matching across snapshots.
    #[must_use]
    pub fn tracking_name(&self) -> &str {
        self.name.trim()
    }
}

/// A timestamped reading of all candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Fetch completion time in the snapshot timezone.
    pub timestamp: DateTime<FixedOffset>,
    /// Candidates in upstream order.
    pub candidates: Vec<Candidate>,
    /// Sum of all candidate votes.
    pub total: u64,
}

impl Snapshot {
    /// Creates a snapshot, computing the total from the candidates.
    pub fn new(timestamp: DateTime<FixedOffset>, candidates: Vec<Candidate>) -> Self {
        let total = candidates.iter().map(|c| c.votes).sum();
        Self {
            timestamp,
            candidates,
            total,
        }
    }

    /// Votes of the first candidate whose trimmed name equals `name`.
    #[must_use]
    pub fn votes_for(&self, name: &str) -> Option<u64> {
        let name = name.trim();
        self.candidates
            .iter()
            .find(|c| c.tracking_name() == name)
            .map(|c| c.votes)
    }

    /// Sheet label of the fetch time, e.g. `2026-02-25 16:29:30`.
    #[must_use]
    pub fn time_label(&self) -> String {
        time_label(&self.timestamp)
    }
}

/// Poll title, body and banner image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollMetadata {
    pub title: String,
    pub body: String,
    pub image: String,
}

// =============================================================================
// Tracked Pair
// =============================================================================

/// Vote counts of the tracked pair at the last persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairBaseline {
    pub a_votes: u64,
    pub b_votes: u64,
}

/// The two candidates whose head-to-head numbers are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPair {
    /// Exact (trimmed) upstream name of the first candidate.
    pub a_name: String,
    /// Short label used in sheet headers for the first candidate.
    pub a_label: String,
    /// Exact (trimmed) upstream name of the second candidate.
    pub b_name: String,
    /// Short label used in sheet headers for the second candidate.
    pub b_label: String,
}

impl TrackedPair {
    /// Creates a pair whose labels equal the names.
    pub fn new(a_name: impl Into<String>, b_name: impl Into<String>) -> Self {
        let a_name = a_name.into();
        let b_name = b_name.into();
        Self {
            a_label: a_name.clone(),
            b_label: b_name.clone(),
            a_name,
            b_name,
        }
    }

    /// Sets the header labels.
    #[must_use]
    pub fn with_labels(mut self, a_label: impl Into<String>, b_label: impl Into<String>) -> Self {
        self.a_label = a_label.into();
        self.b_label = b_label.into();
        self
    }

    /// Six-column header shared by both sinks.
    #[must_use]
    pub fn header(&self) -> [String; 6] {
        [
            "Time".to_string(),
            format!("{} Votes", self.a_label),
            format!("{} (+)", self.a_label),
            format!("{} Votes", self.b_label),
            format!("{} (+)", self.b_label),
            format!("Gap ({}\u{2212}{})", initial(&self.a_label), initial(&self.b_label)),
        ]
    }

    /// Current votes of both tracked candidates, `None` unless both are present.
    #[must_use]
    pub fn votes_in(&self, snapshot: &Snapshot) -> Option<PairBaseline> {
        Some(PairBaseline {
            a_votes: snapshot.votes_for(&self.a_name)?,
            b_votes: snapshot.votes_for(&self.b_name)?,
        })
    }

    /// Builds the persisted row for `current`.
    ///
    /// Diffs are taken against `baseline` when present, otherwise against
    /// `previous` (a candidate missing there diffs to zero), otherwise zero.
    /// Returns `None` when fewer than two tracked candidates are present.
    #[must_use]
    pub fn diff(
        &self,
        current: &Snapshot,
        baseline: Option<PairBaseline>,
        previous: Option<&Snapshot>,
    ) -> Option<TrackedPairDiff> {
        let now = self.votes_in(current)?;

        let (a_diff, b_diff) = match (baseline, previous) {
            (Some(base), _) => (
                signed_diff(now.a_votes, base.a_votes),
                signed_diff(now.b_votes, base.b_votes),
            ),
            (None, Some(prev)) => (
                signed_diff(now.a_votes, prev.votes_for(&self.a_name).unwrap_or(now.a_votes)),
                signed_diff(now.b_votes, prev.votes_for(&self.b_name).unwrap_or(now.b_votes)),
            ),
            (None, None) => (0, 0),
        };

        Some(TrackedPairDiff {
            ts_label: current.time_label(),
            a_votes: now.a_votes,
            a_diff,
            b_votes: now.b_votes,
            b_diff,
            gap: signed_diff(now.a_votes, now.b_votes),
        })
    }
}

fn initial(label: &str) -> String {
    label.chars().next().map(String::from).unwrap_or_default()
}

/// `a - b` as a signed count, saturating at the `i64` range.
#[must_use]
pub fn signed_diff(a: u64, b: u64) -> i64 {
    if a >= b {
        i64::try_from(a - b).unwrap_or(i64::MAX)
    } else {
        i64::try_from(b - a).map(|d| -d).unwrap_or(i64::MIN)
    }
}

/// One persisted row: `Time, VotesA, DiffA, VotesB, DiffB, Gap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPairDiff {
    pub ts_label: String,
    pub a_votes: u64,
    pub a_diff: i64,
    pub b_votes: u64,
    pub b_diff: i64,
    pub gap: i64,
}

impl TrackedPairDiff {
    /// Baseline to diff the next row against.
    #[must_use]
    pub fn baseline(&self) -> PairBaseline {
        PairBaseline {
            a_votes: self.a_votes,
            b_votes: self.b_votes,
        }
    }
}

// =============================================================================
// Previous Day
// =============================================================================

/// Leader and runner-up of the rollover day that just ended.
///
/// `loaded == false` means no data is available yet, which is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousDayFact {
    /// Calendar day in the rollover timezone.
    pub date: Option<NaiveDate>,
    #[serde(rename = "winner")]
    pub winner_name: Option<String>,
    pub winner_votes: u64,
    #[serde(rename = "runnerup")]
    pub runner_up_name: Option<String>,
    #[serde(rename = "runnerup_votes")]
    pub runner_up_votes: u64,
    pub diff: i64,
    pub loaded: bool,
}

impl PreviousDayFact {
    /// Creates a loaded fact.
    pub fn new(
        date: NaiveDate,
        winner_name: impl Into<String>,
        winner_votes: u64,
        runner_up_name: impl Into<String>,
        runner_up_votes: u64,
    ) -> Self {
        Self {
            date: Some(date),
            winner_name: Some(winner_name.into()),
            winner_votes,
            runner_up_name: Some(runner_up_name.into()),
            runner_up_votes,
            diff: signed_diff(winner_votes, runner_up_votes),
            loaded: true,
        }
    }

    /// Reconstructs a fact from a persisted row of the tracked pair.
    ///
    /// The first candidate wins ties.
    #[must_use]
    pub fn from_pair_votes(date: NaiveDate, pair: &TrackedPair, a_votes: u64, b_votes: u64) -> Self {
        if a_votes >= b_votes {
            Self::new(date, pair.a_name.trim(), a_votes, pair.b_name.trim(), b_votes)
        } else {
            Self::new(date, pair.b_name.trim(), b_votes, pair.a_name.trim(), a_votes)
        }
    }
}
