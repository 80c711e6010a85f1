//! Plain-text agenda rendering.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{NaiveDate, NaiveTime};
use recurrence_engine::DayEntry;

const TIME_WIDTH: usize = 11;

fn hm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// "all day", "09:00-17:00", "09:00", "until 17:00"
pub fn time_label(entry: &DayEntry<'_>) -> String {
    if entry.is_all_day {
        return "all day".to_string();
    }
    match (entry.start_time, entry.end_time) {
        (Some(s), Some(e)) => format!("{}-{}", hm(s), hm(e)),
        (Some(s), None) => hm(s),
        (None, Some(e)) => format!("until {}", hm(e)),
        (None, None) => String::new(),
    }
}

fn entry_line(entry: &DayEntry<'_>) -> String {
    let occurrence = entry.occurrence;
    let title = occurrence
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("(No Title)");

    let mut line = format!("  {:<TIME_WIDTH$}  {title}", time_label(entry));
    if let Some(location) = occurrence.location.as_deref().filter(|l| !l.is_empty()) {
        let _ = write!(line, " @ {location}");
    }
    if let Some(description) = occurrence.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = write!(line, " [{description}]");
    }
    line.trim_end().to_string()
}

/// One block per day: a header line, then the day's entries in display order.
pub fn agenda(days: &BTreeMap<NaiveDate, Vec<DayEntry<'_>>>) -> String {
    if days.is_empty() {
        return "No events.\n".to_string();
    }

    let mut out = String::new();
    for (i, (day, entries)) in days.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", day.format("%A, %B %-d, %Y"));
        for entry in entries {
            let _ = writeln!(out, "{}", entry_line(entry));
        }
    }
    out
}
