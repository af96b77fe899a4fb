//! Fixed-offset timezone helpers and sheet time labels.
//!
//! Snapshots carry `DateTime<FixedOffset>` instants. Labels are only produced
//! and parsed at the sink boundary.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

/// Format of the `Time` column in both sinks.
pub const TIME_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Length of `YYYY-MM-DD HH:MM`, the dedup key prefix of a label.
const MINUTE_KEY_LEN: usize = 16;

/// Builds a fixed offset from whole hours east of UTC.
#[must_use]
pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
}

/// Formats an instant as a sheet label in its own offset.
#[must_use]
pub fn time_label<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.format(TIME_LABEL_FORMAT).to_string()
}

/// Parses a sheet label written in `offset`.
#[must_use]
pub fn parse_time_label(label: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(label.trim(), TIME_LABEL_FORMAT).ok()?;
    offset.from_local_datetime(&naive).single()
}

/// Minute-truncated key of a label: `2026-02-25 16:29:30` -> `2026-02-25 16:29`.
#[must_use]
pub fn minute_key(label: &str) -> &str {
    let label = label.trim();
    match label.char_indices().nth(MINUTE_KEY_LEN) {
        Some((idx, _)) => &label[..idx],
        None => label,
    }
}

/// True when both labels fall in the same clock minute.
#[must_use]
pub fn same_minute(a: &str, b: &str) -> bool {
    !a.trim().is_empty() && !b.trim().is_empty() && minute_key(a) == minute_key(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_offset_from_hours() {
        assert_eq!(offset_from_hours(7).unwrap().local_minus_utc(), 25_200);
        assert_eq!(offset_from_hours(-3).unwrap().local_minus_utc(), -10_800);
        assert!(offset_from_hours(30).is_none());
    }

    #[test]
    fn test_time_label_round_trip_keeps_offset() {
        let vn = offset_from_hours(7).unwrap();
        let ts = vn.with_ymd_and_hms(2026, 2, 25, 23, 5, 9).unwrap();
        let label = time_label(&ts);
        assert_eq!(label, "2026-02-25 23:05:09");
        assert_eq!(parse_time_label(&label, vn), Some(ts));
    }

    #[test]
    fn test_label_converted_to_rollover_zone_changes_date() {
        let vn = offset_from_hours(7).unwrap();
        let kst = offset_from_hours(9).unwrap();
        let ts = parse_time_label("2026-02-24 22:30:00", vn).unwrap();
        assert_eq!(
            ts.with_timezone(&kst).date_naive(),
            NaiveDate::from_ymd_opt(2026, 2, 25).unwrap()
        );
        assert_eq!(ts.with_timezone(&Utc).date_naive(), ts.date_naive());
    }

    #[test]
    fn test_parse_time_label_rejects_garbage() {
        let vn = offset_from_hours(7).unwrap();
        assert!(parse_time_label("Time", vn).is_none());
        assert!(parse_time_label("", vn).is_none());
    }

    #[test]
    fn test_minute_key() {
        assert_eq!(minute_key("2026-02-25 16:29:30"), "2026-02-25 16:29");
        assert_eq!(minute_key("short"), "short");
        assert!(same_minute("2026-02-25 16:29:30", "2026-02-25 16:29:45"));
        assert!(!same_minute("2026-02-25 16:29:59", "2026-02-25 16:30:00"));
        assert!(!same_minute("", ""));
    }
}
