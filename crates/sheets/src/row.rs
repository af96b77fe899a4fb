//! Persisted row helpers shared by both sinks.

use serde_json::{json, Value};
use vote_tracker_core::TrackedPairDiff;

/// Number of columns in a persisted row.
pub const ROW_WIDTH: usize = 6;

/// Thousands format for vote counts and the gap.
pub const COUNT_FORMAT: &str = "#,##0";

/// Signed format for per-row diffs.
pub const DIFF_FORMAT: &str = "+#,##0;-#,##0;0";

/// Row as JSON cell values for the Sheets API.
#[must_use]
pub fn row_values(row: &TrackedPairDiff) -> Vec<Value> {
    vec![
        json!(row.ts_label),
        json!(row.a_votes),
        json!(row.a_diff),
        json!(row.b_votes),
        json!(row.b_diff),
        json!(row.gap),
    ]
}

/// `1234567` as `1,234,567`.
#[must_use]
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Signed gap for logs, `TIE` when zero.
#[must_use]
pub fn gap_display(gap: i64) -> String {
    match gap {
        0 => "TIE".to_string(),
        g if g > 0 => format!("+{}", format_thousands(g)),
        g => format_thousands(g),
    }
}
