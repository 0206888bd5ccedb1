//! Selection policy: turns a raw export argument into a traversal bound

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

/// Date format accepted in range arguments (`01.11.2024`)
const DATE_FORMAT: &str = "%d.%m.%Y";

/// Count used when the caller supplies no argument and no override is configured
pub const DEFAULT_COUNT: u32 = 200;

/// Why an export argument was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Looked like a date range but one side is not `DD.MM.YYYY`
    #[error("expected a range like 01.11.2024-05.11.2024")]
    BadDateFormat,

    /// Neither a positive count nor a date range
    #[error("expected a positive message count or a date range")]
    BadArgument,
}

/// Which messages qualify for an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionBound {
    /// The `n` most recent messages
    Count(u32),
    /// Messages with `start <= timestamp <= end`
    DateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl SelectionBound {
    /// Parse a user-supplied argument, falling back to `Count(default_count)`
    /// when the argument is absent or blank.
    ///
    /// Day boundaries are interpreted in UTC. The end date is inclusive
    /// through the last nanosecond of its day, and reversed ranges are swapped.
    ///
    /// # Errors
    ///
    /// Returns `BadDateFormat` when a two-part range fails to parse and
    /// `BadArgument` for anything that is neither a range nor a positive count
    pub fn parse(args: Option<&str>, default_count: u32) -> Result<Self, SelectionError> {
        let Some(raw) = args.map(str::trim).filter(|s| !s.is_empty()) else {
            return if default_count == 0 {
                Err(SelectionError::BadArgument)
            } else {
                Ok(Self::Count(default_count))
            };
        };

        let parts: Vec<&str> = raw.split('-').collect();
        if parts.len() == 2 {
            return parse_range(parts[0], parts[1]);
        }

        if raw.bytes().all(|b| b.is_ascii_digit()) {
            return match raw.parse::<u32>() {
                Ok(n) if n > 0 => Ok(Self::Count(n)),
                _ => Err(SelectionError::BadArgument),
            };
        }

        Err(SelectionError::BadArgument)
    }

    /// Whether the bound is a date range
    #[must_use]
    pub const fn is_date_range(&self) -> bool {
        matches!(self, Self::DateRange { .. })
    }
}

impl fmt::Display for SelectionBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "Last {n}"),
            Self::DateRange { start, end } => write!(
                f,
                "{} - {}",
                start.format(DATE_FORMAT),
                end.format(DATE_FORMAT)
            ),
        }
    }
}

fn parse_range(first: &str, second: &str) -> Result<SelectionBound, SelectionError> {
    let d1 = NaiveDate::parse_from_str(first.trim(), DATE_FORMAT)
        .map_err(|_| SelectionError::BadDateFormat)?;
    let d2 = NaiveDate::parse_from_str(second.trim(), DATE_FORMAT)
        .map_err(|_| SelectionError::BadDateFormat)?;

    let (lo, hi) = if d1 > d2 { (d2, d1) } else { (d1, d2) };

    let end_of_day =
        NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).ok_or(SelectionError::BadDateFormat)?;
    let start = lo.and_time(NaiveTime::MIN).and_utc();
    let end = hi.and_time(end_of_day).and_utc();

    Ok(SelectionBound::DateRange { start, end })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn last_instant(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        utc(y, m, d, 23, 59, 59) + chrono::Duration::nanoseconds(999_999_999)
    }

    #[test]
    fn parses_date_range_with_inclusive_end() {
        let bound = SelectionBound::parse(Some("01.11.2024-05.11.2024"), DEFAULT_COUNT).unwrap();
        assert_eq!(
            bound,
            SelectionBound::DateRange {
                start: utc(2024, 11, 1, 0, 0, 0),
                end: last_instant(2024, 11, 5),
            }
        );
    }

    #[test]
    fn swaps_reversed_range() {
        let bound = SelectionBound::parse(Some("05.11.2024-01.11.2024"), DEFAULT_COUNT).unwrap();
        assert_eq!(
            bound,
            SelectionBound::DateRange {
                start: utc(2024, 11, 1, 0, 0, 0),
                end: last_instant(2024, 11, 5),
            }
        );
    }

    #[test]
    fn single_day_range_covers_whole_day() {
        let bound = SelectionBound::parse(Some("03.02.2025 - 03.02.2025"), DEFAULT_COUNT).unwrap();
        assert_eq!(
            bound,
            SelectionBound::DateRange {
                start: utc(2025, 2, 3, 0, 0, 0),
                end: last_instant(2025, 2, 3),
            }
        );
    }

    #[test]
    fn range_end_includes_fractional_last_second() {
        let bound = SelectionBound::parse(Some("01.11.2024-05.11.2024"), DEFAULT_COUNT).unwrap();
        let SelectionBound::DateRange { end, .. } = bound else {
            panic!("expected a date range");
        };
        let late = utc(2024, 11, 5, 23, 59, 59) + chrono::Duration::milliseconds(500);
        assert!(late <= end);
        assert!(utc(2024, 11, 6, 0, 0, 0) > end);
    }

    #[test]
    fn parses_count() {
        assert_eq!(
            SelectionBound::parse(Some("200"), DEFAULT_COUNT),
            Ok(SelectionBound::Count(200))
        );
        assert_eq!(
            SelectionBound::parse(Some(" 15 "), DEFAULT_COUNT),
            Ok(SelectionBound::Count(15))
        );
    }

    #[test]
    fn missing_argument_uses_default() {
        assert_eq!(
            SelectionBound::parse(None, DEFAULT_COUNT),
            Ok(SelectionBound::Count(200))
        );
        assert_eq!(SelectionBound::parse(Some("  "), 50), Ok(SelectionBound::Count(50)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            SelectionBound::parse(Some("abc"), DEFAULT_COUNT),
            Err(SelectionError::BadArgument)
        );
        assert_eq!(
            SelectionBound::parse(Some("1.5"), DEFAULT_COUNT),
            Err(SelectionError::BadArgument)
        );
    }

    #[test]
    fn rejects_zero_and_overflowing_counts() {
        assert_eq!(
            SelectionBound::parse(Some("0"), DEFAULT_COUNT),
            Err(SelectionError::BadArgument)
        );
        assert_eq!(
            SelectionBound::parse(Some("99999999999999"), DEFAULT_COUNT),
            Err(SelectionError::BadArgument)
        );
    }

    #[test]
    fn malformed_range_is_bad_date_format() {
        assert_eq!(
            SelectionBound::parse(Some("2024.11.01-05.11.2024"), DEFAULT_COUNT),
            Err(SelectionError::BadDateFormat)
        );
        assert_eq!(
            SelectionBound::parse(Some("31.02.2024-01.03.2024"), DEFAULT_COUNT),
            Err(SelectionError::BadDateFormat)
        );
        assert_eq!(
            SelectionBound::parse(Some("-5"), DEFAULT_COUNT),
            Err(SelectionError::BadDateFormat)
        );
    }

    #[test]
    fn three_part_argument_is_bad_argument() {
        assert_eq!(
            SelectionBound::parse(Some("01.11.2024-02.11.2024-03.11.2024"), DEFAULT_COUNT),
            Err(SelectionError::BadArgument)
        );
    }

    #[test]
    fn display_describes_mode() {
        assert_eq!(SelectionBound::Count(30).to_string(), "Last 30");
        let bound = SelectionBound::parse(Some("01.11.2024-05.11.2024"), DEFAULT_COUNT).unwrap();
        assert_eq!(bound.to_string(), "01.11.2024 - 05.11.2024");
        assert!(bound.is_date_range());
    }
}
