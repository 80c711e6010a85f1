//! Human-readable recurrence sentences ("Every 2nd Friday of the month").

use crate::dates::format_long_date;
use crate::model::{EventTemplate, RecurrenceRule};

/// Describe a template's recurrence pattern in one English sentence.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use recurrence_engine::{describe_recurrence, EventTemplate, NthWeek, RecurrenceRule, WeekdayTag};
///
/// let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let t = EventTemplate::new("book-club", start)
///     .repeating(RecurrenceRule::MonthlyNth, 1)
///     .nth(NthWeek::Second, WeekdayTag::Fri)
///     .times(6);
/// assert_eq!(describe_recurrence(&t), "Every 2nd Friday of the month (6 times)");
/// ```
pub fn describe_recurrence(template: &EventTemplate) -> String {
    let interval = template.interval();
    let base = match template.recurrence_rule {
        RecurrenceRule::None => return "Does not repeat".to_string(),
        RecurrenceRule::Daily => every(interval, "day"),
        RecurrenceRule::Weekly => every(interval, "week"),
        RecurrenceRule::Monthly => every(interval, "month"),
        RecurrenceRule::Yearly => every(interval, "year"),
        RecurrenceRule::CustomDays => custom_days(template),
        RecurrenceRule::MonthlyNth => monthly_nth(template),
    };
    format!("{base}{}", bound_suffix(template))
}

fn every(interval: u32, unit: &str) -> String {
    if interval == 1 {
        format!("Every {unit}")
    } else {
        format!("Every {interval} {unit}s")
    }
}

fn custom_days(template: &EventTemplate) -> String {
    if template.recurrence_days.is_empty() {
        return "Custom days".to_string();
    }
    // BTreeSet iterates in declaration order, Monday first
    let days = template
        .recurrence_days
        .iter()
        .map(|d| d.full_name())
        .collect::<Vec<_>>()
        .join(", ");
    match template.interval() {
        1 => format!("Every {days}"),
        n => format!("Every {n} weeks on {days}"),
    }
}

fn monthly_nth(template: &EventTemplate) -> String {
    let (Some(nth), Some(weekday)) = (template.nth_week, template.nth_weekday) else {
        return "Monthly".to_string();
    };
    let mut s = format!("Every {} {} of the month", nth.ordinal(), weekday.full_name());
    let interval = template.interval();
    if interval > 1 {
        s.push_str(&format!(", every {interval} months"));
    }
    s
}

fn bound_suffix(template: &EventTemplate) -> String {
    match (template.recurrence_end_date, template.recurrence_count) {
        (Some(end), _) => format!(" (until {})", format_long_date(end)),
        (None, Some(1)) => " (1 time)".to_string(),
        (None, Some(n)) => format!(" ({n} times)"),
        (None, None) => String::new(),
    }
}
