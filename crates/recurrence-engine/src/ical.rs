//! RFC 5545 export of a template's recurrence.
//!
//! Templates are naive local dates, so the exported `DTSTART`/`EXDATE` values
//! are written as floating times with a `Z` suffix: the wall-clock values are
//! what matters and the `rrule` parser needs a concrete zone.
//!
//! Month-end clamping has no direct RRULE spelling (RFC 5545 skips months
//! that lack the start day). Starts on the 29th-31st are exported with the
//! `BYMONTHDAY=28,..,N;BYSETPOS=-1` idiom, which picks the start day when the
//! month has it and the last day otherwise.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rrule::RRuleSet;

use crate::error::{EngineError, Result};
use crate::expander::series_dates;
use crate::model::{EventTemplate, RecurrenceRule};

/// The `RRULE` value for `template`, or `None` when it does not repeat or its
/// rule is missing the fields it needs (no custom days, no nth position).
pub fn to_rrule_string(template: &EventTemplate) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    let interval = template.interval();
    let start = template.start_date;

    match template.recurrence_rule {
        RecurrenceRule::None => return None,
        RecurrenceRule::Daily => parts.push("FREQ=DAILY".into()),
        RecurrenceRule::Weekly => parts.push("FREQ=WEEKLY".into()),
        RecurrenceRule::Monthly => {
            parts.push("FREQ=MONTHLY".into());
            if start.day() > 28 {
                parts.push(format!("BYMONTHDAY={}", clamped_month_days(start.day())));
                parts.push("BYSETPOS=-1".into());
            }
        }
        RecurrenceRule::Yearly => {
            parts.push("FREQ=YEARLY".into());
            if start.month() == 2 && start.day() == 29 {
                parts.push("BYMONTH=2".into());
                parts.push("BYMONTHDAY=28,29".into());
                parts.push("BYSETPOS=-1".into());
            }
        }
        RecurrenceRule::CustomDays => {
            if template.recurrence_days.is_empty() {
                return None;
            }
            let days: Vec<_> = template.recurrence_days.iter().map(|d| d.ical_code()).collect();
            parts.push("FREQ=WEEKLY".into());
            parts.push(format!("BYDAY={}", days.join(",")));
        }
        RecurrenceRule::MonthlyNth => {
            let (nth, weekday) = (template.nth_week?, template.nth_weekday?);
            parts.push("FREQ=MONTHLY".into());
            parts.push(format!("BYDAY={}{}", nth.position(), weekday.ical_code()));
        }
    }
    parts.insert(1, format!("INTERVAL={interval}"));

    match (template.recurrence_end_date, template.recurrence_count) {
        (Some(until), None) => parts.push(format!("UNTIL={}", until.format("%Y%m%dT235959Z"))),
        (None, Some(count)) => parts.push(format!("COUNT={count}")),
        (Some(until), Some(count)) => {
            // RFC 5545 allows one bound; emit whichever one stops the series first
            let cap = usize::try_from(count).unwrap_or(usize::MAX);
            if series_dates(template, until, cap).len() < cap {
                parts.push(format!("UNTIL={}", until.format("%Y%m%dT235959Z")));
            } else {
                parts.push(format!("COUNT={count}"));
            }
        }
        (None, None) => {}
    }
    parts.push("WKST=MO".into());

    Some(parts.join(";"))
}

fn clamped_month_days(day: u32) -> String {
    (28..=day).map(|d| d.to_string()).collect::<Vec<_>>().join(",")
}

fn dtstart_of(template: &EventTemplate) -> NaiveDateTime {
    let time = match (template.is_all_day, template.start_time) {
        (false, Some(t)) => t,
        _ => NaiveTime::MIN,
    };
    template.start_date.and_time(time)
}

/// The full `DTSTART` / `RRULE` / `EXDATE` text block for `template`.
pub fn to_ical_lines(template: &EventTemplate) -> Result<String> {
    let rrule = to_rrule_string(template).ok_or_else(|| {
        EngineError::InvalidRule(format!("template {} has no exportable recurrence", template.id))
    })?;
    let dtstart = dtstart_of(template);

    let mut lines = vec![
        format!("DTSTART:{}Z", dtstart.format("%Y%m%dT%H%M%S")),
        format!("RRULE:{rrule}"),
    ];
    for date in &template.excluded_dates {
        let exdate = date.and_time(dtstart.time());
        lines.push(format!("EXDATE:{}Z", exdate.format("%Y%m%dT%H%M%S")));
    }
    Ok(lines.join("\n"))
}

/// Parse the exported recurrence back through the `rrule` crate.
pub fn to_rrule_set(template: &EventTemplate) -> Result<RRuleSet> {
    let text = to_ical_lines(template)?;
    text.parse::<RRuleSet>().map_err(|e| {
        EngineError::InvalidRule(format!(
            "rrule rejected export of template {}: {e}",
            template.id
        ))
    })
}

/// Dates produced by an [`RRuleSet`] within `[window_start, window_end]`,
/// at most `limit` of them.
pub fn rrule_dates(
    set: &RRuleSet,
    window_start: NaiveDate,
    window_end: NaiveDate,
    limit: u16,
) -> Vec<NaiveDate> {
    let tz: rrule::Tz = Utc.into();
    let after = (window_start.and_time(NaiveTime::MIN) - Duration::seconds(1))
        .and_utc()
        .with_timezone(&tz);
    let before = (window_end.and_time(NaiveTime::MIN) + Duration::days(1))
        .and_utc()
        .with_timezone(&tz);

    set.clone()
        .after(after)
        .before(before)
        .all(limit)
        .dates
        .iter()
        .map(|dt| dt.date_naive())
        .filter(|d| *d >= window_start && *d <= window_end)
        .collect()
}
