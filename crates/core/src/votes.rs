//! Parsing of vote counts read back from spreadsheet cells.

/// Parses a vote count that may carry thousands separators.
///
/// Spreadsheet locales render `2596698` as `2,596,698` or `2.596.698`; both
/// separators are stripped. Returns `None` for anything that is not a
/// non-negative integer once separators are removed.
#[must_use]
pub fn parse_vote_count(raw: &str) -> Option<u64> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | ' ' | '\u{a0}' | '\u{202f}'))
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}
