//! Window selection flags shared by `expand`, `agenda` and `rrule --check`.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use clap::Args;
use recurrence_engine::dates::{first_of_month, last_of_month, parse_date};
use recurrence_engine::DateRange;

#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// First day of the window (YYYY-MM-DD)
    #[arg(long, requires = "to", conflicts_with = "month")]
    pub from: Option<String>,

    /// Last day of the window, inclusive (YYYY-MM-DD)
    #[arg(long, requires = "from", conflicts_with = "month")]
    pub to: Option<String>,

    /// Whole calendar month (YYYY-MM)
    #[arg(long)]
    pub month: Option<String>,

    /// IANA timezone used to decide what "this month" is
    #[arg(long, default_value = "UTC")]
    pub tz: String,
}

impl WindowArgs {
    pub fn resolve(&self) -> Result<DateRange> {
        self.resolve_at(Utc::now())
    }

    /// Resolve the window, defaulting to the month containing `now` in `--tz`.
    pub fn resolve_at(&self, now: DateTime<Utc>) -> Result<DateRange> {
        if let (Some(from), Some(to)) = (&self.from, &self.to) {
            let start = parse_date(from).context("--from")?;
            let end = parse_date(to).context("--to")?;
            return Ok(DateRange::new(start, end)?);
        }
        if let Some(month) = &self.month {
            return month_range(month);
        }

        let tz: chrono_tz::Tz = self
            .tz
            .parse()
            .map_err(|e| anyhow!("unknown timezone '{}': {e}", self.tz))?;
        let today = now.with_timezone(&tz).date_naive();
        let start = first_of_month(today);
        let end = last_of_month(today.year(), today.month())
            .ok_or_else(|| anyhow!("no month end for {today}"))?;
        Ok(DateRange::new(start, end)?)
    }
}

fn month_range(month: &str) -> Result<DateRange> {
    let Some(first) = parse_month(month) else {
        bail!("--month expects YYYY-MM, got '{month}'");
    };
    let last = last_of_month(first.year(), first.month())
        .ok_or_else(|| anyhow!("no month end for {month}"))?;
    Ok(DateRange::new(first, last)?)
}

fn parse_month(month: &str) -> Option<NaiveDate> {
    let (year, mon) = month.trim().split_once('-')?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, mon.parse().ok()?, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn args(from: Option<&str>, to: Option<&str>, month: Option<&str>, tz: &str) -> WindowArgs {
        WindowArgs {
            from: from.map(String::from),
            to: to.map(String::from),
            month: month.map(String::from),
            tz: tz.to_string(),
        }
    }

    #[test]
    fn test_explicit_range() {
        let r = args(Some("2024-01-01"), Some("2024-02-29"), None, "UTC")
            .resolve()
            .unwrap();
        assert_eq!((r.start, r.end), (d(2024, 1, 1), d(2024, 2, 29)));
    }

    #[test]
    fn test_inverted_range_is_an_error() {
        let err = args(Some("2024-02-01"), Some("2024-01-01"), None, "UTC")
            .resolve()
            .unwrap_err();
        assert!(format!("{err:#}").contains("Invalid window"), "got: {err:#}");
    }

    #[test]
    fn test_month() {
        let r = args(None, None, Some("2024-02"), "UTC").resolve().unwrap();
        assert_eq!((r.start, r.end), (d(2024, 2, 1), d(2024, 2, 29)));
        assert!(args(None, None, Some("2024-13"), "UTC").resolve().is_err());
        assert!(args(None, None, Some("February"), "UTC").resolve().is_err());
    }

    #[test]
    fn test_default_month_follows_timezone() {
        // 23:30 UTC on Jan 31 is already Feb 1 in Tokyo
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
        let utc = args(None, None, None, "UTC").resolve_at(now).unwrap();
        assert_eq!(utc.start, d(2024, 1, 1));
        let tokyo = args(None, None, None, "Asia/Tokyo").resolve_at(now).unwrap();
        assert_eq!((tokyo.start, tokyo.end), (d(2024, 2, 1), d(2024, 2, 29)));
    }

    #[test]
    fn test_unknown_timezone() {
        let err = args(None, None, None, "Mars/Olympus").resolve().unwrap_err();
        assert!(err.to_string().contains("unknown timezone"), "got: {err}");
    }
}
