//! Cold-start recovery of the previous day's result from the remote sheet.

use chrono::{DateTime, Utc};
use vote_tracker_core::{parse_vote_count, DayRolloverTracker, PreviousDayFact, TrackedPair};
use vote_tracker_sheets::{RemoteSheet, Result};

/// Finds the most recent row from yesterday (rollover zone) and rebuilds the
/// previous-day fact from its two vote columns.
///
/// Rows with unparseable vote counts are skipped in favour of the next older
/// row from the same day. `Ok(None)` means no usable row exists.
///
/// # Errors
/// Returns the sheet error if the time column or a row cannot be read.
pub async fn recover_from_history(
    sheet: &dyn RemoteSheet,
    rollover: &DayRolloverTracker,
    pair: &TrackedPair,
    now: DateTime<Utc>,
) -> Result<Option<PreviousDayFact>> {
    let Some(yesterday) = rollover.yesterday_of(&now) else {
        return Ok(None);
    };

    let labels = sheet.time_column().await?;
    if labels.len() <= 1 {
        tracing::warn!("Remote sheet has no data rows to recover from");
        return Ok(None);
    }

    for index in rollover.yesterday_rows(&labels, &now) {
        let cells = sheet.row_values(index).await?;
        let a_votes = cells.get(1).and_then(|c| parse_vote_count(c));
        let b_votes = cells.get(3).and_then(|c| parse_vote_count(c));

        match (a_votes, b_votes) {
            (Some(a), Some(b)) => {
                let fact = PreviousDayFact::from_pair_votes(yesterday, pair, a, b);
                tracing::info!(
                    date = %yesterday,
                    row = index + 1,
                    winner = fact.winner_name.as_deref().unwrap_or_default(),
                    diff = fact.diff,
                    "Recovered previous day"
                );
                return Ok(Some(fact));
            }
            _ => tracing::debug!(row = index + 1, "Skipping malformed row"),
        }
    }

    tracing::warn!(date = %yesterday, "No rows found for previous day");
    Ok(None)
}
