//! Artifact naming
//!
//! A job's artifact is named after its file name stem. Incremental batches
//! that follow an earlier export get a timestamp suffix so they never
//! overwrite the batch before them; full extractions and the first batch
//! reuse the stable name.
//!
//! The suffix is the wall-clock time of `now` in its own time zone, so the
//! caller picks UTC or local time.

use crate::config::schema::FirstRunNaming;
use chrono::{DateTime, TimeZone};
use std::fmt;

/// Timestamp suffix layout: year, day, month, then time of day
pub const TIMESTAMP_FORMAT: &str = "_%Y%d%m_%H%M%S";

/// File name stem (without extension) for one run
///
/// `candidate` is the highest new key found by the bound query, or `None`
/// for a full extraction or a run without new rows.
pub fn artifact_stem<Tz>(
    file_name: &str,
    current: i64,
    candidate: Option<i64>,
    policy: FirstRunNaming,
    now: DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if is_timestamped(current, candidate, policy) {
        format!("{file_name}{}", now.format(TIMESTAMP_FORMAT))
    } else {
        file_name.to_string()
    }
}

fn is_timestamped(current: i64, candidate: Option<i64>, policy: FirstRunNaming) -> bool {
    match candidate {
        Some(candidate) if candidate > current => match policy {
            FirstRunNaming::Stable => current != 0,
            FirstRunNaming::Timestamped => true,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use test_case::test_case;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 24, 10, 15, 30).unwrap()
    }

    #[test]
    fn test_timestamp_layout_is_year_day_month() {
        let stem = artifact_stem("orders", 3, Some(5), FirstRunNaming::Stable, now());
        assert_eq!(stem, "orders_20262401_101530");
    }

    #[test]
    fn test_suffix_uses_wall_clock_of_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let stem = artifact_stem(
            "orders",
            3,
            Some(5),
            FirstRunNaming::Stable,
            now().with_timezone(&tokyo),
        );
        assert_eq!(stem, "orders_20262401_191530");
    }

    #[test_case(0, Some(3), FirstRunNaming::Stable, "orders" ; "first batch stable")]
    #[test_case(0, Some(3), FirstRunNaming::Timestamped, "orders_20262401_101530" ; "first batch timestamped")]
    #[test_case(3, Some(5), FirstRunNaming::Stable, "orders_20262401_101530" ; "later batch")]
    #[test_case(5, Some(5), FirstRunNaming::Stable, "orders" ; "no advance")]
    #[test_case(5, None, FirstRunNaming::Timestamped, "orders" ; "full extraction")]
    fn test_artifact_stem(current: i64, candidate: Option<i64>, policy: FirstRunNaming, expected: &str) {
        assert_eq!(artifact_stem("orders", current, candidate, policy, now()), expected);
    }
}
