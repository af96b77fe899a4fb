//! BStage Plus integration for the vote tracker.
//!
//! - [`SessionManager`] runs the OAuth login chain and keeps a leased token
//! - [`PollFetcher`] pulls poll metadata and live results into a [`vote_tracker_core::Snapshot`]

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::{SessionConfig, SessionManager, SessionStats};
pub use client::{PollFetcher, PollFetcherConfig, PollReading, MAX_AUTH_RETRIES};
pub use error::{BstageError, Result};
