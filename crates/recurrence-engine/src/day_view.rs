//! Per-day rendering of occurrences.
//!
//! A multi-day occurrence shows up on every day it covers, but the times it
//! carries only make sense at its edges: the first day keeps the start time,
//! the last day keeps the end time, and the days in between are all-day.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::model::Occurrence;

/// Where a given day falls within an occurrence's span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanPosition {
    /// The occurrence starts and ends on this day.
    Single,
    First,
    Middle,
    Last,
}

/// An occurrence as it should be rendered on one specific day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayEntry<'a> {
    pub occurrence: &'a Occurrence,
    pub day: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_all_day: bool,
    pub position: SpanPosition,
}

impl DayEntry<'_> {
    /// Ordering key: all-day entries first, then by start time with a missing
    /// start time treated as midnight.
    fn sort_key(&self) -> (bool, NaiveTime) {
        (!self.is_all_day, self.start_time.unwrap_or_default())
    }
}

/// Resolve how `occurrence` renders on `day`, or `None` if the day is outside
/// its span.
pub fn resolve_for_day(occurrence: &Occurrence, day: NaiveDate) -> Option<DayEntry<'_>> {
    if !occurrence.covers(day) {
        return None;
    }

    let start = occurrence.occurrence_start_date;
    let end = occurrence.occurrence_end_date;
    let entry = |start_time, end_time, is_all_day, position| DayEntry {
        occurrence,
        day,
        start_time,
        end_time,
        is_all_day,
        position,
    };

    let resolved = if start == end {
        entry(
            occurrence.start_time,
            occurrence.end_time,
            occurrence.is_all_day,
            SpanPosition::Single,
        )
    } else if day == start {
        entry(occurrence.start_time, None, occurrence.is_all_day, SpanPosition::First)
    } else if day == end {
        entry(None, occurrence.end_time, occurrence.is_all_day, SpanPosition::Last)
    } else {
        entry(None, None, true, SpanPosition::Middle)
    };
    Some(resolved)
}

/// Every occurrence visible on `day`, resolved and ordered for display.
pub fn entries_for_day(occurrences: &[Occurrence], day: NaiveDate) -> Vec<DayEntry<'_>> {
    let mut entries: Vec<_> = occurrences
        .iter()
        .filter_map(|o| resolve_for_day(o, day))
        .collect();
    entries.sort_by_key(|e| e.sort_key());
    entries
}

/// Bucket occurrences by the days of `[window_start, window_end]` they cover.
/// Days with no entries are absent from the map.
pub fn group_by_day(
    occurrences: &[Occurrence],
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> BTreeMap<NaiveDate, Vec<DayEntry<'_>>> {
    let mut days: BTreeMap<NaiveDate, Vec<DayEntry<'_>>> = BTreeMap::new();

    for occurrence in occurrences {
        let first = occurrence.occurrence_start_date.max(window_start);
        let last = occurrence.occurrence_end_date.min(window_end);
        for day in first.iter_days().take_while(|d| *d <= last) {
            if let Some(entry) = resolve_for_day(occurrence, day) {
                days.entry(day).or_default().push(entry);
            }
        }
    }

    for entries in days.values_mut() {
        entries.sort_by_key(|e| e.sort_key());
    }
    days
}
