//! Core types for the live vote tracker.
//!
//! This crate provides:
//! - Snapshot and candidate models plus the tracked-pair row they produce
//! - A bounded snapshot history with velocity and gap metrics
//! - Day-rollover detection in a fixed timezone
//! - Layered configuration (defaults, TOML, environment)

pub mod config;
pub mod config_loader;
pub mod models;
pub mod rollover;
pub mod snapshot_store;
pub mod time;
pub mod votes;

pub use config::{
    AppConfig, BstageConfig, ExecutionMode, GoogleSheetsConfig, HistoryConfig, PersistenceConfig,
    PollConfig, ServerConfig, TimezoneConfig, TrackingConfig,
};
pub use config_loader::ConfigLoader;
pub use models::{
    signed_diff, Candidate, PairBaseline, PollMetadata, PreviousDayFact, Snapshot, TrackedPair,
    TrackedPairDiff,
};
pub use rollover::{DayRolloverTracker, RolloverState, MISSING_RUNNER_UP};
pub use snapshot_store::{
    elapsed_minutes, gap_from_leader, velocity_between, vote_diff, SnapshotStore,
    MIN_ELAPSED_MINUTES,
};
pub use time::{minute_key, parse_time_label, same_minute, time_label, TIME_LABEL_FORMAT};
pub use votes::parse_vote_count;
