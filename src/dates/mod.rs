//! Start/end date validation.
//!
//! Upstream history begins in 2013, so anything earlier is rejected as an
//! out-of-coverage range. Accepted input shape is `201Y-MM-DD`.

use crate::error::{HistoryError, Result};
use crate::models::DateRange;
use chrono::{Datelike, NaiveDate, NaiveDateTime};

const FIRST_YEAR: i32 = 2013;

/// Anything that can be turned into a `yyyy-mm-dd` string for validation.
pub trait DateInput {
    fn to_date_string(&self) -> String;
}

impl DateInput for &str {
    fn to_date_string(&self) -> String {
        (*self).to_string()
    }
}

impl DateInput for String {
    fn to_date_string(&self) -> String {
        self.clone()
    }
}

impl DateInput for NaiveDate {
    fn to_date_string(&self) -> String {
        self.format("%Y-%m-%d").to_string()
    }
}

impl DateInput for NaiveDateTime {
    fn to_date_string(&self) -> String {
        self.date().to_date_string()
    }
}

/// Validate a start/end pair and build a `DateRange`.
pub fn validate(start: impl DateInput, end: impl DateInput) -> Result<DateRange> {
    let start_s = start.to_date_string();
    let end_s = end.to_date_string();

    let start = parse_strict(&start_s, "start_date")?;
    let end = parse_strict(&end_s, "end_date")?;

    let reason = if start.year() < FIRST_YEAR {
        Some("start year must be 2013 or later")
    } else if end.year() < FIRST_YEAR {
        Some("end year must be 2013 or later")
    } else if end < start {
        Some("end date precedes start date")
    } else {
        None
    };

    if let Some(reason) = reason {
        return Err(HistoryError::InvalidRange {
            start: start_s,
            end: end_s,
            reason,
        });
    }

    Ok(DateRange::new_unchecked(start, end))
}

/// Shape check (`201Y-MM-DD`) then calendar check.
fn parse_strict(s: &str, which: &'static str) -> Result<NaiveDate> {
    let invalid = || HistoryError::InvalidFormat {
        which,
        value: s.to_string(),
    };

    if !has_expected_shape(s) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())
}

fn has_expected_shape(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return false;
    }
    let digits = [0usize, 1, 2, 3, 5, 6, 8, 9];
    if !digits.iter().all(|&i| b[i].is_ascii_digit()) {
        return false;
    }
    &b[..3] == b"201" && matches!(b[5], b'0' | b'1') && matches!(b[8], b'0'..=b'3')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_valid_range() {
        let range = assert_ok!(validate("2017-06-01", "2018-06-01"));
        assert_eq!(range.compact_start(), "20170601");
        assert_eq!(range.compact_end(), "20180601");
    }

    #[test]
    fn test_same_day_is_valid() {
        assert_ok!(validate("2013-04-28", "2013-04-28"));
    }

    #[test]
    fn test_date_objects_match_strings() {
        let s = NaiveDate::from_ymd_opt(2017, 6, 1).unwrap();
        let e = NaiveDate::from_ymd_opt(2018, 6, 1).unwrap();
        assert_eq!(
            validate(s, e).unwrap(),
            validate("2017-06-01", "2018-06-01").unwrap()
        );
        let dt = s.and_hms_opt(12, 30, 0).unwrap();
        assert_eq!(validate(dt, e).unwrap().start(), s);
    }

    #[test]
    fn test_malformed_strings() {
        for bad in [
            "2018-3-3",
            "2018/03/03",
            "2018-03-3x",
            "abcd-ef-gh",
            "2018-02-30",
            "2017-04-31",
            "2018-13-01",
            "2018-00-10",
            "2018-01-01 ",
            "",
        ] {
            let err = validate("2017-05-05", bad).unwrap_err();
            assert!(
                matches!(err, HistoryError::InvalidFormat { which: "end_date", .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_years_outside_201x_are_format_errors() {
        let err = assert_err!(validate("2020-01-01", "2019-01-01"));
        assert!(matches!(err, HistoryError::InvalidFormat { which: "start_date", .. }));
    }

    #[test]
    fn test_pre_coverage_years_are_range_errors() {
        let err = assert_err!(validate("2012-12-31", "2014-01-01"));
        assert!(matches!(err, HistoryError::InvalidRange { .. }));
        let err = assert_err!(validate("2014-01-01", "2010-01-01"));
        assert!(matches!(err, HistoryError::InvalidRange { .. }));
    }

    #[test]
    fn test_end_before_start() {
        let err = assert_err!(validate("2018-06-02", "2018-06-01"));
        assert!(matches!(err, HistoryError::InvalidRange { .. }));
    }
}
