//! Bounded history of poll snapshots and the metrics derived from it.
//!
//! The store is a ring buffer: appends are O(1) and the oldest snapshot is
//! evicted once capacity is reached. Capacity bounds memory only; it is sized
//! to roughly one day at the configured poll interval.

use crate::models::{signed_diff, Candidate, Snapshot};
use std::collections::VecDeque;

/// Smallest elapsed time used for velocity, in minutes (one second).
///
/// Two ticks landing sub-second apart would otherwise divide by almost zero.
pub const MIN_ELAPSED_MINUTES: f64 = 1.0 / 60.0;

/// Default capacity: one day of snapshots at a 5 second cadence.
pub const DEFAULT_HISTORY_CAPACITY: usize = 17_280;

/// Fixed-capacity, append-ordered snapshot history.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SnapshotStore {
    /// Creates an empty store. A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends a snapshot, evicting the oldest when full.
    pub fn append(&mut self, snapshot: Snapshot) {
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    /// The two most recent snapshots as `(previous, latest)`.
    #[must_use]
    pub fn latest_two(&self) -> Option<(&Snapshot, &Snapshot)> {
        let n = self.snapshots.len();
        if n < 2 {
            return None;
        }
        Some((&self.snapshots[n - 2], &self.snapshots[n - 1]))
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// Copies the full history in append order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Snapshot> {
        self.snapshots.iter().cloned().collect()
    }

    /// Votes per minute of `name` between the two latest snapshots.
    ///
    /// Zero when fewer than two snapshots exist.
    #[must_use]
    pub fn velocity(&self, name: &str) -> f64 {
        self.velocity_with_floor(name, MIN_ELAPSED_MINUTES)
    }

    /// Like [`velocity`](Self::velocity) with an explicit elapsed-time floor.
    #[must_use]
    pub fn velocity_with_floor(&self, name: &str, floor_minutes: f64) -> f64 {
        match self.latest_two() {
            Some((prev, cur)) => {
                vote_diff(prev, cur, name) as f64 / elapsed_minutes_with_floor(prev, cur, floor_minutes)
            }
            None => 0.0,
        }
    }
}

/// Minutes between two snapshots, clamped to [`MIN_ELAPSED_MINUTES`].
#[must_use]
pub fn elapsed_minutes(prev: &Snapshot, cur: &Snapshot) -> f64 {
    elapsed_minutes_with_floor(prev, cur, MIN_ELAPSED_MINUTES)
}

fn elapsed_minutes_with_floor(prev: &Snapshot, cur: &Snapshot, floor_minutes: f64) -> f64 {
    let millis = (cur.timestamp - prev.timestamp).num_milliseconds();
    (millis as f64 / 60_000.0).max(floor_minutes)
}

/// Vote change of `name` from `prev` to `cur`.
///
/// A name absent from `prev` has zero change; a name absent from `cur` too.
#[must_use]
pub fn vote_diff(prev: &Snapshot, cur: &Snapshot, name: &str) -> i64 {
    match cur.votes_for(name) {
        Some(now) => signed_diff(now, prev.votes_for(name).unwrap_or(now)),
        None => 0,
    }
}

/// Votes per minute of `name` between two snapshots.
#[must_use]
pub fn velocity_between(prev: &Snapshot, cur: &Snapshot, name: &str) -> f64 {
    vote_diff(prev, cur, name) as f64 / elapsed_minutes(prev, cur)
}

/// Distance of each candidate from the leader, in input order.
#[must_use]
pub fn gap_from_leader(candidates: &[Candidate]) -> Vec<u64> {
    let leader = candidates.iter().map(|c| c.votes).max().unwrap_or(0);
    candidates.iter().map(|c| leader - c.votes).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn base_time() -> chrono::DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 2, 25, 16, 0, 0)
            .unwrap()
    }

    fn snap(offset_ms: i64, votes: u64) -> Snapshot {
        Snapshot::new(
            base_time() + Duration::milliseconds(offset_ms),
            vec![Candidate::new("1", "A", votes), Candidate::new("2", "B", 10)],
        )
    }

    #[test]
    fn test_store_keeps_most_recent_capacity_entries() {
        for (n, cap) in [(0usize, 3usize), (2, 3), (3, 3), (10, 3), (7, 1)] {
            let mut store = SnapshotStore::new(cap);
            for i in 0..n {
                store.append(snap(i as i64 * 1000, i as u64));
            }
            assert_eq!(store.len(), n.min(cap));

            let kept: Vec<u64> = store.iter().map(|s| s.candidates[0].votes).collect();
            let expected: Vec<u64> = (n.saturating_sub(cap)..n).map(|i| i as u64).collect();
            assert_eq!(kept, expected, "n={n} cap={cap}");
        }
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut store = SnapshotStore::new(0);
        store.append(snap(0, 1));
        store.append(snap(1000, 2));
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.latest().unwrap().candidates[0].votes, 2);
    }

    #[test]
    fn test_latest_two_order() {
        let mut store = SnapshotStore::new(5);
        assert!(store.latest_two().is_none());
        store.append(snap(0, 1));
        assert!(store.latest_two().is_none());
        store.append(snap(1000, 2));
        let (prev, cur) = store.latest_two().unwrap();
        assert_eq!(prev.candidates[0].votes, 1);
        assert_eq!(cur.candidates[0].votes, 2);
    }

    #[test]
    fn test_velocity_one_minute_apart() {
        let mut store = SnapshotStore::new(10);
        store.append(snap(0, 1000));
        store.append(snap(60_000, 1100));
        assert!((store.velocity("A") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_sub_second_is_clamped() {
        let mut store = SnapshotStore::new(10);
        store.append(snap(0, 1000));
        store.append(snap(500, 1001));
        assert!((store.velocity("A") - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_unknown_or_new_name_is_zero() {
        let mut store = SnapshotStore::new(10);
        assert_eq!(store.velocity("A"), 0.0);
        store.append(snap(0, 1000));
        store.append(Snapshot::new(
            base_time() + Duration::seconds(30),
            vec![Candidate::new("1", "A", 1010), Candidate::new("3", " C ", 99)],
        ));
        assert_eq!(store.velocity("C"), 0.0);
        assert_eq!(store.velocity("Z"), 0.0);
        assert!((store.velocity("A") - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_downward_blip_is_negative() {
        let prev = snap(0, 1000);
        let cur = snap(60_000, 990);
        assert!((velocity_between(&prev, &cur, "A") + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_from_leader() {
        let candidates = vec![
            Candidate::new("1", "A", 500),
            Candidate::new("2", "B", 300),
            Candidate::new("3", "C", 500),
        ];
        assert_eq!(gap_from_leader(&candidates), vec![0, 200, 0]);
        assert!(gap_from_leader(&[]).is_empty());
    }
}
