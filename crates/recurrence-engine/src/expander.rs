//! Template → occurrence expansion.
//!
//! The expander is a pure function of `(templates, window, options)`. It owns
//! no state between calls and is re-run on every render.
//!
//! Every recurring template is handled in two steps:
//!
//! 1. [`series_dates`] walks the template's series from `start_date` up to the
//!    scan bound (the earlier of the window end and `recurrence_end_date`) and
//!    stops at the series cap. Every member counts towards `recurrence_count`,
//!    in the window or not, excluded or not. The safety cap for an unbounded
//!    series counts the same way, except for custom-day and nth-weekday rules
//!    where only members inside the window count.
//! 2. The members inside the window that are not in `excluded_dates` become
//!    [`Occurrence`]s.

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::dates::{
    add_days, add_months, add_years, first_of_month, monday_on_or_before, nth_weekday_of_month,
};
use crate::model::{EventTemplate, Occurrence, RecurrenceRule, TemplateRow, WeekdayTag};

/// Cap on generated dates for a series with neither an end date nor a count.
///
/// Fixed-period rules count every generated date against it. Custom-day and
/// nth-weekday rules count only dates inside the window, so an open-ended
/// weekday series keeps showing up years after it started.
pub const DEFAULT_MAX_GENERATED: usize = 365;

/// Knobs for [`expand_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Series cap applied when a template sets neither `recurrence_end_date`
    /// nor `recurrence_count`.
    pub max_generated: usize,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            max_generated: DEFAULT_MAX_GENERATED,
        }
    }
}

impl ExpandOptions {
    #[must_use]
    pub fn with_max_generated(mut self, max: usize) -> Self {
        self.max_generated = max;
        self
    }

    /// The generation budget for one template expanded into a window
    /// starting at `window_start`.
    fn budget_for(&self, template: &EventTemplate, window_start: NaiveDate) -> Budget {
        match (template.recurrence_count, template.recurrence_end_date) {
            (Some(count), _) => Budget::series(usize::try_from(count).unwrap_or(usize::MAX)),
            (None, Some(_)) => Budget::series(usize::MAX),
            (None, None) => match template.recurrence_rule {
                RecurrenceRule::CustomDays | RecurrenceRule::MonthlyNth => {
                    Budget::in_window(self.max_generated, window_start)
                }
                _ => Budget::series(self.max_generated),
            },
        }
    }
}

/// How many series members may still be generated.
///
/// Only members on or after `counted_from` use up the limit.
#[derive(Debug, Clone, Copy)]
struct Budget {
    limit: usize,
    counted_from: NaiveDate,
    used: usize,
}

impl Budget {
    /// Every member counts.
    fn series(limit: usize) -> Self {
        Self {
            limit,
            counted_from: NaiveDate::MIN,
            used: 0,
        }
    }

    /// Only members inside the window count.
    fn in_window(limit: usize, window_start: NaiveDate) -> Self {
        Self {
            limit,
            counted_from: window_start,
            used: 0,
        }
    }

    fn exhausted(&self) -> bool {
        self.used >= self.limit
    }

    fn take(&mut self, date: NaiveDate, out: &mut Vec<NaiveDate>) {
        out.push(date);
        if date >= self.counted_from {
            self.used += 1;
        }
    }
}

// ── Entry points ────────────────────────────────────────────────────────────

/// Expand `templates` into every occurrence intersecting
/// `[window_start, window_end]` (both inclusive) with default options.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use recurrence_engine::{expand, EventTemplate, RecurrenceRule};
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
/// let standup = EventTemplate::new("standup", d(1, 1)).repeating(RecurrenceRule::Weekly, 2);
///
/// let dates: Vec<_> = expand(&[standup], d(1, 1), d(2, 29))
///     .into_iter()
///     .map(|o| o.occurrence_start_date)
///     .collect();
/// assert_eq!(dates, vec![d(1, 1), d(1, 15), d(1, 29), d(2, 12), d(2, 26)]);
/// ```
pub fn expand(
    templates: &[EventTemplate],
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<Occurrence> {
    expand_with_options(templates, window_start, window_end, &ExpandOptions::default())
}

/// [`expand`] with explicit [`ExpandOptions`].
///
/// An inverted window (`window_start > window_end`) yields no occurrences.
/// Output is grouped by template in input order, each template's
/// occurrences in ascending date order.
pub fn expand_with_options(
    templates: &[EventTemplate],
    window_start: NaiveDate,
    window_end: NaiveDate,
    options: &ExpandOptions,
) -> Vec<Occurrence> {
    if window_start > window_end {
        debug!(%window_start, %window_end, "inverted window, nothing to expand");
        return Vec::new();
    }

    let occurrences: Vec<Occurrence> = templates
        .iter()
        .flat_map(|t| expand_template(t, window_start, window_end, options))
        .collect();

    debug!(
        templates = templates.len(),
        occurrences = occurrences.len(),
        %window_start,
        %window_end,
        "expanded templates"
    );
    occurrences
}

/// Validate raw store rows and expand the ones that convert. Rows with
/// malformed dates or recurrence metadata are logged and skipped.
pub fn expand_rows(
    rows: &[TemplateRow],
    window_start: NaiveDate,
    window_end: NaiveDate,
    options: &ExpandOptions,
) -> Vec<Occurrence> {
    let templates = templates_from_rows(rows);
    expand_with_options(&templates, window_start, window_end, options)
}

/// Convert rows to templates, dropping (and logging) the ones that fail.
pub fn templates_from_rows(rows: &[TemplateRow]) -> Vec<EventTemplate> {
    rows.iter()
        .filter_map(|row| match EventTemplate::try_from(row) {
            Ok(template) => Some(template),
            Err(error) => {
                warn!(template_id = %row.id, %error, "skipping malformed template");
                None
            }
        })
        .collect()
}

/// Expand a single template. The building block of [`expand_with_options`],
/// also callable on its own, so it rejects an inverted window itself.
pub fn expand_template(
    template: &EventTemplate,
    window_start: NaiveDate,
    window_end: NaiveDate,
    options: &ExpandOptions,
) -> Vec<Occurrence> {
    if window_start > window_end {
        return Vec::new();
    }

    if !template.is_recurring() {
        let overlaps = template.start_date <= window_end && template.end_date >= window_start;
        return if overlaps {
            vec![Occurrence::single(template)]
        } else {
            Vec::new()
        };
    }

    let scan_bound = match template.recurrence_end_date {
        Some(end) => end.min(window_end),
        None => window_end,
    };

    generate(template, scan_bound, options.budget_for(template, window_start))
        .into_iter()
        .filter(|date| *date >= window_start && !template.excluded_dates.contains(date))
        .map(|date| Occurrence::instance(template, date))
        .collect()
}

// ── Series generation ───────────────────────────────────────────────────────

/// Every member of the template's series from `start_date` up to and
/// including `scan_bound`, at most `cap` of them, in ascending order.
///
/// Window and exclusion filtering are not applied here. Non-recurring
/// templates and recurring ones missing their rule-specific fields produce
/// an empty series.
pub fn series_dates(template: &EventTemplate, scan_bound: NaiveDate, cap: usize) -> Vec<NaiveDate> {
    generate(template, scan_bound, Budget::series(cap))
}

fn generate(template: &EventTemplate, scan_bound: NaiveDate, mut budget: Budget) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    if budget.exhausted() || template.start_date > scan_bound {
        return dates;
    }

    let budget = &mut budget;
    match template.recurrence_rule {
        RecurrenceRule::None => {}
        RecurrenceRule::Daily
        | RecurrenceRule::Weekly
        | RecurrenceRule::Monthly
        | RecurrenceRule::Yearly => fixed_period(template, scan_bound, budget, &mut dates),
        RecurrenceRule::CustomDays => custom_days(template, scan_bound, budget, &mut dates),
        RecurrenceRule::MonthlyNth => monthly_nth(template, scan_bound, budget, &mut dates),
    }
    dates
}

/// The k-th step of a fixed-period rule, always measured from `start_date`
/// so month clamping never accumulates.
fn nth_step(template: &EventTemplate, k: u32) -> Option<NaiveDate> {
    let steps = k.checked_mul(template.interval())?;
    let start = template.start_date;
    match template.recurrence_rule {
        RecurrenceRule::Daily => add_days(start, u64::from(steps)),
        RecurrenceRule::Weekly => add_days(start, u64::from(steps) * 7),
        RecurrenceRule::Monthly => add_months(start, steps),
        RecurrenceRule::Yearly => add_years(start, steps),
        _ => None,
    }
}

fn fixed_period(
    template: &EventTemplate,
    scan_bound: NaiveDate,
    budget: &mut Budget,
    out: &mut Vec<NaiveDate>,
) {
    for k in 0u32.. {
        if budget.exhausted() {
            break;
        }
        match nth_step(template, k) {
            Some(date) if date <= scan_bound => budget.take(date, out),
            _ => break,
        }
    }
}

fn custom_days(
    template: &EventTemplate,
    scan_bound: NaiveDate,
    budget: &mut Budget,
    out: &mut Vec<NaiveDate>,
) {
    if template.recurrence_days.is_empty() {
        return;
    }
    let stride = u64::from(template.interval()) * 7;
    let mut week = monday_on_or_before(template.start_date);

    'weeks: while week <= scan_bound && !budget.exhausted() {
        for day in week.iter_days().take(7) {
            if day > scan_bound {
                break 'weeks;
            }
            if day < template.start_date {
                continue;
            }
            if template.recurrence_days.contains(&WeekdayTag::from(day.weekday())) {
                budget.take(day, out);
                if budget.exhausted() {
                    break 'weeks;
                }
            }
        }
        match add_days(week, stride) {
            Some(next) => week = next,
            None => break,
        }
    }
}

fn monthly_nth(
    template: &EventTemplate,
    scan_bound: NaiveDate,
    budget: &mut Budget,
    out: &mut Vec<NaiveDate>,
) {
    let (Some(nth), Some(weekday)) = (template.nth_week, template.nth_weekday) else {
        return;
    };
    let first_month = first_of_month(template.start_date);

    for k in 0u32.. {
        if budget.exhausted() {
            break;
        }
        let Some(month) = k
            .checked_mul(template.interval())
            .and_then(|months| add_months(first_month, months))
        else {
            break;
        };
        if month > scan_bound {
            break;
        }
        let selected = nth_weekday_of_month(month.year(), month.month(), weekday.into(), nth.position());
        if let Some(date) = selected {
            if date >= template.start_date && date <= scan_bound {
                budget.take(date, out);
            }
        }
    }
}
