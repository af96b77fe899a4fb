//! JSON view of the tracker state served by the API.

use crate::state::TrackerState;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use vote_tracker_core::{
    elapsed_minutes, gap_from_leader, signed_diff, vote_diff, Candidate, PreviousDayFact, Snapshot,
};

/// A candidate with its movement since the previous snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateView {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Votes per minute, one decimal.
    pub velocity: f64,
    pub diff: i64,
    pub gap_from_first: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentStateView {
    pub poll_title: String,
    pub poll_body: String,
    pub poll_image: String,
    pub candidates: Vec<CandidateView>,
    pub total_votes: u64,
    pub last_updated: Option<DateTime<FixedOffset>>,
    pub error: Option<String>,
    pub total_diff: i64,
    pub total_velocity: f64,
    pub fetch_interval: u64,
    pub history_length: usize,
    /// Present only once a fact has been loaded.
    pub previous_day: Option<PreviousDayFact>,
}

impl CurrentStateView {
    #[must_use]
    pub fn build(state: &TrackerState, fetch_interval_secs: u64) -> Self {
        let gaps = gap_from_leader(&state.candidates);
        let latest_two = state.store.latest_two();

        let candidates = state
            .candidates
            .iter()
            .zip(gaps)
            .map(|(candidate, gap_from_first)| {
                let (diff, velocity) = match latest_two {
                    Some((prev, cur)) => movement(prev, cur, candidate.tracking_name()),
                    None => (0, 0.0),
                };
                CandidateView {
                    candidate: candidate.clone(),
                    velocity,
                    diff,
                    gap_from_first,
                }
            })
            .collect();

        let (total_diff, total_velocity) = match latest_two {
            Some((prev, cur)) => {
                let diff = signed_diff(cur.total, prev.total);
                (diff, round1(diff as f64 / elapsed_minutes(prev, cur)))
            }
            None => (0, 0.0),
        };

        Self {
            poll_title: state.metadata.title.clone(),
            poll_body: state.metadata.body.clone(),
            poll_image: state.metadata.image.clone(),
            candidates,
            total_votes: state.total_votes,
            last_updated: state.last_updated,
            error: state.error.clone(),
            total_diff,
            total_velocity,
            fetch_interval: fetch_interval_secs,
            history_length: state.store.len(),
            previous_day: state.previous_day.loaded.then(|| state.previous_day.clone()),
        }
    }
}

fn movement(prev: &Snapshot, cur: &Snapshot, name: &str) -> (i64, f64) {
    let diff = vote_diff(prev, cur, name);
    (diff, round1(diff as f64 / elapsed_minutes(prev, cur)))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use vote_tracker_core::{DayRolloverTracker, PollMetadata, SnapshotStore};
    use vote_tracker_sheets::PersistenceThrottle;

    fn vn() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn at(secs: i64) -> DateTime<FixedOffset> {
        vn().with_ymd_and_hms(2026, 2, 25, 16, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn state() -> TrackerState {
        TrackerState::new(
            SnapshotStore::new(100),
            PersistenceThrottle::new(std::time::Duration::from_secs(60)),
            DayRolloverTracker::new(FixedOffset::east_opt(9 * 3600).unwrap(), vn()),
        )
    }

    fn snap(secs: i64, a: u64, b: u64) -> Snapshot {
        Snapshot::new(at(secs), vec![Candidate::new("1", "A", a), Candidate::new("2", "B", b)])
    }

    #[test]
    fn test_single_snapshot_has_zero_movement() {
        let mut state = state();
        state.apply(snap(0, 1000, 400), PollMetadata::default());

        let view = CurrentStateView::build(&state, 3);
        assert_eq!(view.candidates[0].velocity, 0.0);
        assert_eq!(view.candidates[1].diff, 0);
        assert_eq!(view.candidates[1].gap_from_first, 600);
        assert_eq!(view.total_diff, 0);
        assert_eq!(view.history_length, 1);
        assert_eq!(view.fetch_interval, 3);
        assert!(view.previous_day.is_none());
    }

    #[test]
    fn test_velocity_per_minute() {
        let mut state = state();
        state.apply(snap(0, 1000, 400), PollMetadata::default());
        state.apply(snap(60, 1100, 400), PollMetadata::default());

        let view = CurrentStateView::build(&state, 3);
        assert_eq!(view.candidates[0].diff, 100);
        assert_eq!(view.candidates[0].velocity, 100.0);
        assert_eq!(view.total_velocity, 100.0);

        state.apply(snap(90, 1130, 400), PollMetadata::default());
        let view = CurrentStateView::build(&state, 3);
        assert_eq!(view.candidates[0].velocity, 60.0);
        assert_eq!(view.total_diff, 30);
    }

    #[test]
    fn test_json_keys() {
        let mut state = state();
        state.apply(
            snap(0, 10, 5),
            PollMetadata {
                title: "Weekly Pick".to_string(),
                body: String::new(),
                image: String::new(),
            },
        );
        state.previous_day = PreviousDayFact::new(
            NaiveDate::from_ymd_opt(2026, 2, 24).unwrap(),
            "A",
            10,
            "B",
            5,
        );

        let json = serde_json::to_value(CurrentStateView::build(&state, 3)).unwrap();
        assert_eq!(json["poll_title"], "Weekly Pick");
        assert_eq!(json["candidates"][0]["name"], "A");
        assert_eq!(json["candidates"][0]["image"], "");
        assert_eq!(json["candidates"][1]["gap_from_first"], 5);
        assert_eq!(json["previous_day"]["winner"], "A");
        assert_eq!(json["previous_day"]["date"], "2026-02-24");
        assert!(json["error"].is_null());
    }
}
