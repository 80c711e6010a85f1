//! Property tests for the expander.
//!
//! Properties checked over generated templates and windows:
//! - single events appear exactly once iff they overlap the window
//! - fixed-period dates sit on the `start + k·interval` lattice and inside the bounds
//! - excluding a date removes exactly that occurrence
//! - a count caps the series over the whole timeline, for every rule
//! - nth-weekday and custom-day series only hit the requested weekdays

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate};
use proptest::prelude::*;
use recurrence_engine::dates::{add_days, add_months, add_years};
use recurrence_engine::{
    expand, EventTemplate, NthWeek, Occurrence, RecurrenceRule, WeekdayTag,
};

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0u64..2000).prop_map(|offset| base() + Days::new(offset))
}

fn window_strategy() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (date_strategy(), 0u64..400).prop_map(|(start, len)| (start, start + Days::new(len)))
}

fn fixed_rule() -> impl Strategy<Value = RecurrenceRule> {
    prop_oneof![
        Just(RecurrenceRule::Daily),
        Just(RecurrenceRule::Weekly),
        Just(RecurrenceRule::Monthly),
        Just(RecurrenceRule::Yearly),
    ]
}

fn weekday_strategy() -> impl Strategy<Value = WeekdayTag> {
    (0usize..7).prop_map(|i| WeekdayTag::ALL[i])
}

fn nth_strategy() -> impl Strategy<Value = NthWeek> {
    prop_oneof![
        Just(NthWeek::First),
        Just(NthWeek::Second),
        Just(NthWeek::Third),
        Just(NthWeek::Fourth),
        Just(NthWeek::Fifth),
        Just(NthWeek::Last),
    ]
}

/// Positions that match in every month.
fn monthly_nth_strategy() -> impl Strategy<Value = NthWeek> {
    prop_oneof![
        Just(NthWeek::First),
        Just(NthWeek::Second),
        Just(NthWeek::Third),
        Just(NthWeek::Fourth),
        Just(NthWeek::Last),
    ]
}

/// The rule-specific part of a recurring template.
#[derive(Debug, Clone)]
enum Shape {
    Fixed(RecurrenceRule),
    Days(BTreeSet<WeekdayTag>),
    Nth(NthWeek, WeekdayTag),
}

impl Shape {
    fn template(&self, start: NaiveDate, interval: u32) -> EventTemplate {
        let t = EventTemplate::new("c", start);
        match self {
            Shape::Fixed(rule) => t.repeating(*rule, interval),
            Shape::Days(days) => t
                .repeating(RecurrenceRule::CustomDays, interval)
                .on_days(days.iter().copied()),
            Shape::Nth(nth, weekday) => t
                .repeating(RecurrenceRule::MonthlyNth, interval)
                .nth(*nth, *weekday),
        }
    }
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    prop_oneof![
        fixed_rule().prop_map(Shape::Fixed),
        proptest::collection::btree_set(weekday_strategy(), 1..4).prop_map(Shape::Days),
        (monthly_nth_strategy(), weekday_strategy()).prop_map(|(nth, weekday)| Shape::Nth(nth, weekday)),
    ]
}

fn starts(occurrences: &[Occurrence]) -> Vec<NaiveDate> {
    occurrences.iter().map(|o| o.occurrence_start_date).collect()
}

/// Every lattice point `start + k·interval` up to `bound`.
fn lattice(rule: RecurrenceRule, start: NaiveDate, interval: u32, bound: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    for k in 0u32.. {
        let steps = k * interval;
        let date = match rule {
            RecurrenceRule::Daily => add_days(start, u64::from(steps)),
            RecurrenceRule::Weekly => add_days(start, u64::from(steps) * 7),
            RecurrenceRule::Monthly => add_months(start, steps),
            RecurrenceRule::Yearly => add_years(start, steps),
            _ => None,
        };
        match date {
            Some(d) if d <= bound => out.push(d),
            _ => break,
        }
    }
    out
}

proptest! {
    #[test]
    fn single_event_appears_iff_overlapping(
        start in date_strategy(),
        len in 0u64..10,
        (ws, we) in window_strategy(),
    ) {
        let end = start + Days::new(len);
        let t = EventTemplate::new("s", start).ending(end);
        let out = expand(std::slice::from_ref(&t), ws, we);
        let overlaps = start <= we && end >= ws;
        prop_assert_eq!(out.len(), usize::from(overlaps));
        if overlaps {
            prop_assert_eq!(&out[0], &Occurrence::single(&t));
        }
    }

    #[test]
    fn fixed_period_dates_lie_on_lattice(
        rule in fixed_rule(),
        start in date_strategy(),
        interval in 1u32..5,
        until in proptest::option::of(date_strategy()),
        (ws, we) in window_strategy(),
    ) {
        let mut t = EventTemplate::new("f", start).repeating(rule, interval);
        if let Some(u) = until {
            t = t.until(u);
        }
        let bound = until.map_or(we, |u| u.min(we));
        let expected: Vec<_> = lattice(rule, start, interval, bound)
            .into_iter()
            .filter(|d| *d >= ws)
            .collect();
        let out = expand(&[t], ws, we);
        // Daily series without an end date may hit the safety cap first
        let got = starts(&out);
        prop_assert!(got.len() <= expected.len());
        prop_assert_eq!(&got[..], &expected[..got.len()]);
        if until.is_some() {
            prop_assert_eq!(got, expected);
        }
        for occ in &out {
            prop_assert!(occ.is_recurring_instance);
            prop_assert_eq!(occ.occurrence_start_date, occ.occurrence_end_date);
        }
    }

    #[test]
    fn excluding_a_date_removes_exactly_it(
        rule in fixed_rule(),
        start in date_strategy(),
        interval in 1u32..4,
        pick in any::<prop::sample::Index>(),
        (ws, we) in window_strategy(),
    ) {
        let t = EventTemplate::new("x", start).repeating(rule, interval).until(we);
        let before = starts(&expand(std::slice::from_ref(&t), ws, we));
        prop_assume!(!before.is_empty());
        let victim = before[pick.index(before.len())];

        let after = starts(&expand(&[t.excluding([victim])], ws, we));
        let mut expected = before.clone();
        expected.retain(|d| *d != victim);
        prop_assert_eq!(after, expected);
    }

    #[test]
    fn count_caps_series_over_full_timeline(
        shape in shape_strategy(),
        start in date_strategy(),
        interval in 1u32..4,
        count in 1u32..20,
    ) {
        let t = shape.template(start, interval).times(count);
        let end = NaiveDate::from_ymd_opt(2099, 12, 31).unwrap();
        let out = expand(&[t], start, end);
        prop_assert_eq!(out.len(), count as usize);
    }

    #[test]
    fn count_is_independent_of_window(
        shape in shape_strategy(),
        start in date_strategy(),
        interval in 1u32..4,
        count in 1u32..30,
        (ws, we) in window_strategy(),
    ) {
        let t = shape.template(start, interval).times(count);
        let end = NaiveDate::from_ymd_opt(2099, 12, 31).unwrap();
        let full = starts(&expand(std::slice::from_ref(&t), start, end));
        let windowed = starts(&expand(&[t], ws, we));
        let expected: Vec<_> = full.into_iter().filter(|d| *d >= ws && *d <= we).collect();
        prop_assert_eq!(windowed, expected);
    }

    #[test]
    fn monthly_nth_hits_requested_weekday(
        start in date_strategy(),
        nth in nth_strategy(),
        weekday in weekday_strategy(),
        interval in 1u32..4,
        (ws, we) in window_strategy(),
    ) {
        let t = EventTemplate::new("n", start)
            .repeating(RecurrenceRule::MonthlyNth, interval)
            .nth(nth, weekday);
        for date in starts(&expand(&[t], ws, we)) {
            prop_assert_eq!(WeekdayTag::from(date.weekday()), weekday);
            prop_assert!(date >= start && date >= ws && date <= we);
            let position = (date.day() - 1) / 7 + 1;
            match nth {
                NthWeek::Last => prop_assert!((date + Days::new(7)).month() != date.month()),
                other => prop_assert_eq!(position as i32, other.position()),
            }
        }
    }

    #[test]
    fn custom_days_only_hit_selected_days(
        start in date_strategy(),
        days in proptest::collection::btree_set(weekday_strategy(), 1..4),
        interval in 1u32..4,
        (ws, we) in window_strategy(),
    ) {
        let t = EventTemplate::new("c", start)
            .repeating(RecurrenceRule::CustomDays, interval)
            .on_days(days.iter().copied());
        let monday = recurrence_engine::dates::monday_on_or_before(start);
        for date in starts(&expand(&[t], ws, we)) {
            prop_assert!(days.contains(&WeekdayTag::from(date.weekday())));
            let weeks = (date - monday).num_days() / 7;
            prop_assert_eq!(weeks % i64::from(interval), 0);
        }
    }
}
