use chrono::{DateTime, FixedOffset};
use vote_tracker_core::{
    Candidate, DayRolloverTracker, PollMetadata, PreviousDayFact, Snapshot, SnapshotStore,
};
use vote_tracker_sheets::PersistenceThrottle;

/// Everything the tick loop mutates, kept behind a single lock.
///
/// The lock is only held for in-memory updates, never across an `.await`.
#[derive(Debug, Clone)]
pub struct TrackerState {
    pub store: SnapshotStore,
    pub candidates: Vec<Candidate>,
    pub metadata: PollMetadata,
    pub total_votes: u64,
    pub last_updated: Option<DateTime<FixedOffset>>,
    /// Latest soft failure, cleared by the next successful fetch.
    pub error: Option<String>,
    pub throttle: PersistenceThrottle,
    pub previous_day: PreviousDayFact,
    pub rollover: DayRolloverTracker,
}

impl TrackerState {
    pub fn new(store: SnapshotStore, throttle: PersistenceThrottle, rollover: DayRolloverTracker) -> Self {
        Self {
            store,
            candidates: Vec::new(),
            metadata: PollMetadata::default(),
            total_votes: 0,
            last_updated: None,
            error: None,
            throttle,
            previous_day: PreviousDayFact::default(),
            rollover,
        }
    }

    /// Records a successful fetch.
    pub fn apply(&mut self, snapshot: Snapshot, metadata: PollMetadata) {
        self.candidates = snapshot.candidates.clone();
        self.total_votes = snapshot.total;
        self.last_updated = Some(snapshot.timestamp);
        self.metadata = metadata;
        self.error = None;
        self.store.append(snapshot);
    }

    /// Runs the rollover check against the live candidates.
    pub fn check_day_change(&mut self, now: &DateTime<FixedOffset>) -> bool {
        match self.rollover.check_day_change(now, &self.candidates) {
            Some(fact) => {
                self.previous_day = fact;
                true
            }
            None => false,
        }
    }

    /// Snapshots needed to build the next persisted row: `(current, previous)`.
    #[must_use]
    pub fn write_inputs(&self) -> Option<(Snapshot, Option<Snapshot>)> {
        let current = self.store.latest()?.clone();
        let previous = self.store.latest_two().map(|(prev, _)| prev.clone());
        Some((current, previous))
    }
}
