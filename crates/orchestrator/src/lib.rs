//! Live tracking loop for a single BStage poll.
//!
//! [`VoteTracker`] owns the shared state (snapshot history, current tally,
//! write throttle, rollover tracker) and drives it either from a fixed-interval
//! loop or on demand in stateless hosting.

pub mod recovery;
pub mod state;
pub mod tracker;
pub mod view;

pub use recovery::recover_from_history;
pub use state::TrackerState;
pub use tracker::{TrackerSettings, VoteTracker};
pub use view::{CandidateView, CurrentStateView};
