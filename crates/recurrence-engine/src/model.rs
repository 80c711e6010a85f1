//! Event templates, store rows, and expanded occurrences.
//!
//! [`TemplateRow`] is the row exactly as the persistence layer hands it over:
//! strings for dates and times, numbers that sometimes arrive as strings, and
//! a `recurrence_days` column that is either a list or a JSON-encoded list.
//! [`EventTemplate`] is the validated form the expander works on. Conversion
//! between the two is the per-template failure boundary: a row that does not
//! convert is skipped, never the whole batch.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::dates::{parse_date, parse_time};
use crate::error::{EngineError, Result};

// ── Weekday tags ────────────────────────────────────────────────────────────

/// Three-letter uppercase weekday tag (`MON` … `SUN`) as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeekdayTag {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl WeekdayTag {
    pub const ALL: [WeekdayTag; 7] = [
        WeekdayTag::Mon,
        WeekdayTag::Tue,
        WeekdayTag::Wed,
        WeekdayTag::Thu,
        WeekdayTag::Fri,
        WeekdayTag::Sat,
        WeekdayTag::Sun,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WeekdayTag::Mon => "MON",
            WeekdayTag::Tue => "TUE",
            WeekdayTag::Wed => "WED",
            WeekdayTag::Thu => "THU",
            WeekdayTag::Fri => "FRI",
            WeekdayTag::Sat => "SAT",
            WeekdayTag::Sun => "SUN",
        }
    }

    /// "Monday", "Tuesday", ...
    pub fn full_name(self) -> &'static str {
        match self {
            WeekdayTag::Mon => "Monday",
            WeekdayTag::Tue => "Tuesday",
            WeekdayTag::Wed => "Wednesday",
            WeekdayTag::Thu => "Thursday",
            WeekdayTag::Fri => "Friday",
            WeekdayTag::Sat => "Saturday",
            WeekdayTag::Sun => "Sunday",
        }
    }

    /// Two-letter RFC 5545 weekday code.
    pub fn ical_code(self) -> &'static str {
        match self {
            WeekdayTag::Mon => "MO",
            WeekdayTag::Tue => "TU",
            WeekdayTag::Wed => "WE",
            WeekdayTag::Thu => "TH",
            WeekdayTag::Fri => "FR",
            WeekdayTag::Sat => "SA",
            WeekdayTag::Sun => "SU",
        }
    }
}

impl From<Weekday> for WeekdayTag {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => WeekdayTag::Mon,
            Weekday::Tue => WeekdayTag::Tue,
            Weekday::Wed => WeekdayTag::Wed,
            Weekday::Thu => WeekdayTag::Thu,
            Weekday::Fri => WeekdayTag::Fri,
            Weekday::Sat => WeekdayTag::Sat,
            Weekday::Sun => WeekdayTag::Sun,
        }
    }
}

impl From<WeekdayTag> for Weekday {
    fn from(tag: WeekdayTag) -> Self {
        match tag {
            WeekdayTag::Mon => Weekday::Mon,
            WeekdayTag::Tue => Weekday::Tue,
            WeekdayTag::Wed => Weekday::Wed,
            WeekdayTag::Thu => Weekday::Thu,
            WeekdayTag::Fri => Weekday::Fri,
            WeekdayTag::Sat => Weekday::Sat,
            WeekdayTag::Sun => Weekday::Sun,
        }
    }
}

impl FromStr for WeekdayTag {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MON" => Ok(WeekdayTag::Mon),
            "TUE" => Ok(WeekdayTag::Tue),
            "WED" => Ok(WeekdayTag::Wed),
            "THU" => Ok(WeekdayTag::Thu),
            "FRI" => Ok(WeekdayTag::Fri),
            "SAT" => Ok(WeekdayTag::Sat),
            "SUN" => Ok(WeekdayTag::Sun),
            _ => Err(EngineError::InvalidWeekday(s.to_string())),
        }
    }
}

impl fmt::Display for WeekdayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Recurrence rule ─────────────────────────────────────────────────────────

/// The named repetition pattern of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceRule {
    /// A single concrete event.
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// A set of weekdays within every `interval`-th Monday-start week.
    CustomDays,
    /// The nth (or last) given weekday of every `interval`-th month.
    MonthlyNth,
}

impl RecurrenceRule {
    pub fn is_recurring(self) -> bool {
        self != RecurrenceRule::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceRule::None => "NONE",
            RecurrenceRule::Daily => "DAILY",
            RecurrenceRule::Weekly => "WEEKLY",
            RecurrenceRule::Monthly => "MONTHLY",
            RecurrenceRule::Yearly => "YEARLY",
            RecurrenceRule::CustomDays => "CUSTOM_DAYS",
            RecurrenceRule::MonthlyNth => "MONTHLY_NTH",
        }
    }
}

impl FromStr for RecurrenceRule {
    type Err = EngineError;

    /// Empty strings and `NONE` both mean "does not repeat".
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "NONE" => Ok(RecurrenceRule::None),
            "DAILY" => Ok(RecurrenceRule::Daily),
            "WEEKLY" => Ok(RecurrenceRule::Weekly),
            "MONTHLY" => Ok(RecurrenceRule::Monthly),
            "YEARLY" => Ok(RecurrenceRule::Yearly),
            "CUSTOM_DAYS" => Ok(RecurrenceRule::CustomDays),
            "MONTHLY_NTH" => Ok(RecurrenceRule::MonthlyNth),
            _ => Err(EngineError::InvalidRule(s.to_string())),
        }
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Nth week ────────────────────────────────────────────────────────────────

/// Position of the weekday within the month for `MONTHLY_NTH`.
///
/// Serialized as its integer position, with `-1` for [`NthWeek::Last`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum NthWeek {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Last,
}

impl NthWeek {
    /// 1-based position, or -1 for last.
    pub fn position(self) -> i32 {
        match self {
            NthWeek::First => 1,
            NthWeek::Second => 2,
            NthWeek::Third => 3,
            NthWeek::Fourth => 4,
            NthWeek::Fifth => 5,
            NthWeek::Last => -1,
        }
    }

    /// "1st", "2nd", ..., "last"
    pub fn ordinal(self) -> &'static str {
        match self {
            NthWeek::First => "1st",
            NthWeek::Second => "2nd",
            NthWeek::Third => "3rd",
            NthWeek::Fourth => "4th",
            NthWeek::Fifth => "5th",
            NthWeek::Last => "last",
        }
    }
}

impl TryFrom<i64> for NthWeek {
    type Error = EngineError;

    fn try_from(n: i64) -> Result<Self> {
        match n {
            1 => Ok(NthWeek::First),
            2 => Ok(NthWeek::Second),
            3 => Ok(NthWeek::Third),
            4 => Ok(NthWeek::Fourth),
            5 => Ok(NthWeek::Fifth),
            -1 => Ok(NthWeek::Last),
            _ => Err(EngineError::InvalidRule(format!(
                "nth_week must be 1-5 or -1, got {n}"
            ))),
        }
    }
}

impl From<NthWeek> for i64 {
    fn from(n: NthWeek) -> Self {
        i64::from(n.position())
    }
}

// ── Store row ───────────────────────────────────────────────────────────────

/// A scalar column that may hold a number or its string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Number(i64),
    Text(String),
}

impl RawScalar {
    /// Integer value, or `None` for blank text. Non-numeric text is an error.
    fn as_int(&self, field: &str) -> Result<Option<i64>> {
        match self {
            RawScalar::Number(n) => Ok(Some(*n)),
            RawScalar::Text(s) if s.trim().is_empty() => Ok(None),
            RawScalar::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| EngineError::InvalidRule(format!("{field} is not a number: '{s}'"))),
        }
    }
}

impl Default for RawScalar {
    fn default() -> Self {
        RawScalar::Text(String::new())
    }
}

impl fmt::Display for RawScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawScalar::Number(n) => write!(f, "{n}"),
            RawScalar::Text(s) => f.write_str(s),
        }
    }
}

/// The `recurrence_days` column: a list of tags, or that list JSON-encoded
/// into a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDays {
    List(Vec<String>),
    Encoded(String),
}

impl RawDays {
    fn tags(&self) -> Result<BTreeSet<WeekdayTag>> {
        let decoded;
        let names: &[String] = match self {
            RawDays::List(names) => names,
            RawDays::Encoded(s) if s.trim().is_empty() => return Ok(BTreeSet::new()),
            RawDays::Encoded(s) => {
                decoded = serde_json::from_str::<Vec<String>>(s).map_err(|e| {
                    EngineError::InvalidWeekday(format!("recurrence_days '{s}': {e}"))
                })?;
                &decoded
            }
        };
        names.iter().map(|name| name.parse()).collect()
    }
}

/// One `calendar_events` row as returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateRow {
    pub id: RawScalar,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_all_day: Option<bool>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub recurrence_rule: Option<String>,
    pub recurrence_interval: Option<RawScalar>,
    pub recurrence_days: Option<RawDays>,
    pub nth_week: Option<RawScalar>,
    pub nth_weekday: Option<String>,
    pub recurrence_end_date: Option<String>,
    pub recurrence_count: Option<RawScalar>,
    pub excluded_dates: Option<Vec<String>>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ── Template ────────────────────────────────────────────────────────────────

fn default_interval() -> u32 {
    1
}

/// A validated event template: one concrete event, or the rule of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub recurrence_rule: RecurrenceRule,
    #[serde(default = "default_interval")]
    pub recurrence_interval: u32,
    #[serde(default)]
    pub recurrence_days: BTreeSet<WeekdayTag>,
    #[serde(default)]
    pub nth_week: Option<NthWeek>,
    #[serde(default)]
    pub nth_weekday: Option<WeekdayTag>,
    #[serde(default)]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub recurrence_count: Option<u32>,
    #[serde(default)]
    pub excluded_dates: BTreeSet<NaiveDate>,
}

impl EventTemplate {
    /// A single-day, non-recurring, all-day-false template.
    pub fn new(id: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            location: None,
            color: None,
            start_date,
            end_date: start_date,
            is_all_day: false,
            start_time: None,
            end_time: None,
            recurrence_rule: RecurrenceRule::None,
            recurrence_interval: 1,
            recurrence_days: BTreeSet::new(),
            nth_week: None,
            nth_weekday: None,
            recurrence_end_date: None,
            recurrence_count: None,
            excluded_dates: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn ending(mut self, end_date: NaiveDate) -> Self {
        self.end_date = end_date;
        self
    }

    #[must_use]
    pub fn all_day(mut self) -> Self {
        self.is_all_day = true;
        self
    }

    #[must_use]
    pub fn at(mut self, start: NaiveTime, end: Option<NaiveTime>) -> Self {
        self.start_time = Some(start);
        self.end_time = end;
        self
    }

    #[must_use]
    pub fn repeating(mut self, rule: RecurrenceRule, interval: u32) -> Self {
        self.recurrence_rule = rule;
        self.recurrence_interval = interval.max(1);
        self
    }

    #[must_use]
    pub fn on_days(mut self, days: impl IntoIterator<Item = WeekdayTag>) -> Self {
        self.recurrence_days = days.into_iter().collect();
        self
    }

    #[must_use]
    pub fn nth(mut self, week: NthWeek, weekday: WeekdayTag) -> Self {
        self.nth_week = Some(week);
        self.nth_weekday = Some(weekday);
        self
    }

    #[must_use]
    pub fn until(mut self, end: NaiveDate) -> Self {
        self.recurrence_end_date = Some(end);
        self
    }

    #[must_use]
    pub fn times(mut self, count: u32) -> Self {
        self.recurrence_count = Some(count);
        self
    }

    #[must_use]
    pub fn excluding(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.excluded_dates.extend(dates);
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence_rule.is_recurring()
    }

    /// Interval with stored zeros treated as 1.
    pub fn interval(&self) -> u32 {
        self.recurrence_interval.max(1)
    }
}

impl TryFrom<&TemplateRow> for EventTemplate {
    type Error = EngineError;

    fn try_from(row: &TemplateRow) -> Result<Self> {
        let id = row.id.to_string();
        let invalid = |reason: String| EngineError::InvalidTemplate {
            id: id.clone(),
            reason,
        };
        if id.trim().is_empty() {
            return Err(invalid("missing id".into()));
        }

        let start_date = non_blank(&row.start_date)
            .ok_or_else(|| invalid("missing start_date".into()))
            .and_then(|s| parse_date(s).map_err(|e| invalid(e.to_string())))?;
        let end_date = match non_blank(&row.end_date) {
            Some(s) => parse_date(s).map_err(|e| invalid(e.to_string()))?,
            None => start_date,
        };
        if end_date < start_date {
            return Err(invalid(format!(
                "end_date {end_date} is before start_date {start_date}"
            )));
        }

        let parse_opt_time = |value: &Option<String>| {
            non_blank(value)
                .map(parse_time)
                .transpose()
                .map_err(|e| invalid(e.to_string()))
        };
        let parse_opt_date = |value: &Option<String>| {
            non_blank(value)
                .map(parse_date)
                .transpose()
                .map_err(|e| invalid(e.to_string()))
        };
        let parse_opt_int = |value: &Option<RawScalar>, field: &str| -> Result<Option<i64>> {
            match value {
                Some(v) => v.as_int(field).map_err(|e| invalid(e.to_string())),
                None => Ok(None),
            }
        };

        let recurrence_rule = match non_blank(&row.recurrence_rule) {
            Some(s) => s
                .parse::<RecurrenceRule>()
                .map_err(|e| invalid(e.to_string()))?,
            None => RecurrenceRule::None,
        };

        let recurrence_interval = parse_opt_int(&row.recurrence_interval, "recurrence_interval")?
            .filter(|n| *n > 0)
            .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX));

        let recurrence_count = parse_opt_int(&row.recurrence_count, "recurrence_count")?
            .filter(|n| *n > 0)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX));

        let recurrence_days = match &row.recurrence_days {
            Some(days) => days.tags().map_err(|e| invalid(e.to_string()))?,
            None => BTreeSet::new(),
        };

        let nth_week = parse_opt_int(&row.nth_week, "nth_week")?
            .map(NthWeek::try_from)
            .transpose()
            .map_err(|e| invalid(e.to_string()))?;

        let nth_weekday = non_blank(&row.nth_weekday)
            .map(str::parse::<WeekdayTag>)
            .transpose()
            .map_err(|e| invalid(e.to_string()))?;

        let excluded_dates = row
            .excluded_dates
            .iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date(s))
            .collect::<Result<BTreeSet<_>>>()
            .map_err(|e| invalid(e.to_string()))?;

        let start_time = parse_opt_time(&row.start_time)?;
        let end_time = parse_opt_time(&row.end_time)?;
        let recurrence_end_date = parse_opt_date(&row.recurrence_end_date)?;

        Ok(Self {
            id,
            title: row.title.clone(),
            description: row.description.clone(),
            location: row.location.clone(),
            color: row.color.clone(),
            start_date,
            end_date,
            is_all_day: row.is_all_day.unwrap_or(false),
            start_time,
            end_time,
            recurrence_rule,
            recurrence_interval,
            recurrence_days,
            nth_week,
            nth_weekday,
            recurrence_end_date,
            recurrence_count,
            excluded_dates,
        })
    }
}

// ── Occurrence ──────────────────────────────────────────────────────────────

/// One concrete, dated instance of a template. Produced fresh by every
/// expansion and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub original_template_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub occurrence_start_date: NaiveDate,
    pub occurrence_end_date: NaiveDate,
    pub is_all_day: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub recurrence_rule: RecurrenceRule,
    pub is_recurring_instance: bool,
}

impl Occurrence {
    /// The template itself as its only occurrence.
    pub fn single(template: &EventTemplate) -> Self {
        Self::from_template(template, template.start_date, template.end_date, false)
    }

    /// A rule-generated instance on `date`.
    pub fn instance(template: &EventTemplate, date: NaiveDate) -> Self {
        Self::from_template(template, date, date, true)
    }

    fn from_template(
        template: &EventTemplate,
        start: NaiveDate,
        end: NaiveDate,
        is_recurring_instance: bool,
    ) -> Self {
        Self {
            original_template_id: template.id.clone(),
            title: template.title.clone(),
            description: template.description.clone(),
            location: template.location.clone(),
            color: template.color.clone(),
            occurrence_start_date: start,
            occurrence_end_date: end,
            is_all_day: template.is_all_day,
            start_time: template.start_time,
            end_time: template.end_time,
            recurrence_rule: template.recurrence_rule,
            is_recurring_instance,
        }
    }

    /// `(original_template_id, occurrence_start_date)`: the only identity an
    /// occurrence has.
    pub fn key(&self) -> (&str, NaiveDate) {
        (&self.original_template_id, self.occurrence_start_date)
    }

    pub fn is_multi_day(&self) -> bool {
        self.occurrence_start_date != self.occurrence_end_date
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        self.occurrence_start_date <= day && day <= self.occurrence_end_date
    }
}
