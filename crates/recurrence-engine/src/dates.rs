//! Naive local-date arithmetic.
//!
//! Everything here works on `NaiveDate` / `NaiveTime` only. Calendar dates
//! coming from the store carry no timezone, and converting them through UTC
//! is exactly what produces off-by-one days around midnight, so no function
//! in this module ever attaches an offset.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveTime, Weekday};

use crate::error::{EngineError, Result};

// ── Parsing ─────────────────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| EngineError::InvalidDate(format!("'{s}': {e}")))
}

/// Parse a 24-hour `HH:MM` or `HH:MM:SS` time of day.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| EngineError::InvalidTime(format!("'{s}': {e}")))
}

// ── Stepping ────────────────────────────────────────────────────────────────

/// Add whole calendar months, clamping the day to the end of a shorter month
/// (Jan 31 + 1 month = Feb 29 in a leap year).
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Add whole calendar years. Feb 29 lands on Feb 28 in common years.
pub fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    add_months(date, years.checked_mul(12)?)
}

pub fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

/// The Monday of the ISO week containing `date`.
pub fn monday_on_or_before(date: NaiveDate) -> NaiveDate {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// First day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the given month.
pub fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
}

/// Find the nth `weekday` in a month. `nth < 0` counts from the end of the
/// month (-1 = last). Returns `None` when the month has no such position
/// (e.g. a 5th Friday in a month with four).
pub fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, nth: i32) -> Option<NaiveDate> {
    if nth == 0 {
        return None;
    }
    let target = if nth > 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let diff = (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
        let weeks = u64::try_from(nth - 1).ok()?.checked_mul(7)?;
        first
            .checked_add_days(Days::new(u64::from(diff)))?
            .checked_add_days(Days::new(weeks))?
    } else {
        let last = last_of_month(year, month)?;
        let diff = (last.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
        let weeks = u64::try_from(-i64::from(nth) - 1).ok()?.checked_mul(7)?;
        last
            .checked_sub_days(Days::new(u64::from(diff)))?
            .checked_sub_days(Days::new(weeks))?
    };
    (target.month() == month && target.year() == year).then_some(target)
}

// ── Formatting ──────────────────────────────────────────────────────────────

/// "March 31, 2024"
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // ── parsing ─────────────────────────────────────────────────────────

    #[test]
    fn test_parse_date_iso() {
        assert_eq!(parse_date("2024-03-08").unwrap(), d(2024, 3, 8));
        assert_eq!(parse_date(" 2024-12-31 ").unwrap(), d(2024, 12, 31));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        for bad in ["", "2024-02-30", "2024/03/08", "tomorrow", "2024-13-01"] {
            let err = parse_date(bad).unwrap_err().to_string();
            assert!(err.contains("Invalid date"), "got: {err}");
        }
    }

    #[test]
    fn test_parse_time_with_and_without_seconds() {
        assert_eq!(parse_time("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(
            parse_time("17:05:42").unwrap(),
            NaiveTime::from_hms_opt(17, 5, 42).unwrap()
        );
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("noon").is_err());
    }

    // ── stepping ────────────────────────────────────────────────────────

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months(d(2024, 1, 31), 1), Some(d(2024, 2, 29)));
        assert_eq!(add_months(d(2023, 1, 31), 1), Some(d(2023, 2, 28)));
        assert_eq!(add_months(d(2024, 1, 31), 2), Some(d(2024, 3, 31)));
    }

    #[test]
    fn test_add_years_leap_day() {
        assert_eq!(add_years(d(2024, 2, 29), 1), Some(d(2025, 2, 28)));
        assert_eq!(add_years(d(2024, 2, 29), 4), Some(d(2028, 2, 29)));
    }

    #[test]
    fn test_monday_on_or_before() {
        // 2024-01-03 is a Wednesday
        assert_eq!(monday_on_or_before(d(2024, 1, 3)), d(2024, 1, 1));
        // Sunday belongs to the week that started six days earlier
        assert_eq!(monday_on_or_before(d(2024, 1, 7)), d(2024, 1, 1));
        assert_eq!(monday_on_or_before(d(2024, 1, 8)), d(2024, 1, 8));
    }

    #[test]
    fn test_last_of_month() {
        assert_eq!(last_of_month(2024, 2), Some(d(2024, 2, 29)));
        assert_eq!(last_of_month(2024, 12), Some(d(2024, 12, 31)));
    }

    // ── nth weekday ─────────────────────────────────────────────────────

    #[test]
    fn test_nth_weekday_second_friday() {
        assert_eq!(nth_weekday_of_month(2024, 3, Weekday::Fri, 2), Some(d(2024, 3, 8)));
        assert_eq!(nth_weekday_of_month(2024, 6, Weekday::Fri, 2), Some(d(2024, 6, 14)));
    }

    #[test]
    fn test_nth_weekday_last() {
        assert_eq!(nth_weekday_of_month(2024, 3, Weekday::Fri, -1), Some(d(2024, 3, 29)));
        // May 2024 ends on a Friday
        assert_eq!(nth_weekday_of_month(2024, 5, Weekday::Fri, -1), Some(d(2024, 5, 31)));
    }

    #[test]
    fn test_nth_weekday_missing_fifth() {
        // February 2024 has four Fridays
        assert_eq!(nth_weekday_of_month(2024, 2, Weekday::Fri, 5), None);
        // March 2024 has five Fridays
        assert_eq!(nth_weekday_of_month(2024, 3, Weekday::Fri, 5), Some(d(2024, 3, 29)));
        assert_eq!(nth_weekday_of_month(2024, 3, Weekday::Fri, 0), None);
    }

    #[test]
    fn test_nth_weekday_at_end_of_calendar_is_none() {
        let year = NaiveDate::MAX.year();
        let month = NaiveDate::MAX.month();
        for nth in [1, 4, 5, -1, -5, i32::MAX, i32::MIN] {
            if let Some(date) = nth_weekday_of_month(year, month, Weekday::Fri, nth) {
                assert_eq!(date.weekday(), Weekday::Fri);
                assert_eq!((date.year(), date.month()), (year, month));
            }
        }
    }

    #[test]
    fn test_format_long_date() {
        assert_eq!(format_long_date(d(2024, 3, 8)), "March 8, 2024");
    }
}
