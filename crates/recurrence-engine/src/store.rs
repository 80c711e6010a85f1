//! Persistence seam.
//!
//! The engine never talks to a database. It defines what it needs from one
//! ([`EventStore`]) and the coarse range predicate a backing query should
//! apply ([`DateRange::may_contain`]), and ships an in-memory implementation
//! used by the CLI and the tests.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::expander::{expand_with_options, ExpandOptions};
use crate::model::{EventTemplate, Occurrence};

/// Inclusive `[start, end]` calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Errors with [`EngineError::InvalidWindow`] when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(EngineError::InvalidWindow(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether `[start, end]` shares at least one day with this range.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end && end >= self.start
    }

    /// Number of days in the range, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Coarse store-side filter: could this template produce an occurrence in
    /// the range?
    ///
    /// Single events must overlap the range. Series must have started by the
    /// range end and not ended before the range start. Exact membership is
    /// left to the expander.
    pub fn may_contain(&self, template: &EventTemplate) -> bool {
        if !template.is_recurring() {
            return self.overlaps(template.start_date, template.end_date);
        }
        template.start_date <= self.end
            && template
                .recurrence_end_date
                .is_none_or(|until| until >= self.start)
    }
}

/// Template storage as the engine sees it.
pub trait EventStore {
    /// Templates that may produce occurrences in `range`.
    fn query(&self, range: &DateRange) -> Result<Vec<EventTemplate>>;

    /// Insert a template, replacing any template with the same id.
    fn insert(&mut self, template: EventTemplate);

    /// Delete a template. Returns whether it existed.
    fn delete(&mut self, id: &str) -> Result<bool>;

    /// Add `date` to a template's `excluded_dates`. Adding a date that is
    /// already excluded is a no-op.
    fn add_excluded_date(&mut self, id: &str, date: NaiveDate) -> Result<()>;
}

/// Vector-backed [`EventStore`] that keeps insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    templates: Vec<EventTemplate>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&EventTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn templates(&self) -> &[EventTemplate] {
        &self.templates
    }
}

impl FromIterator<EventTemplate> for InMemoryEventStore {
    fn from_iter<I: IntoIterator<Item = EventTemplate>>(iter: I) -> Self {
        let mut store = Self::new();
        for template in iter {
            store.insert(template);
        }
        store
    }
}

impl EventStore for InMemoryEventStore {
    fn query(&self, range: &DateRange) -> Result<Vec<EventTemplate>> {
        Ok(self
            .templates
            .iter()
            .filter(|t| range.may_contain(t))
            .cloned()
            .collect())
    }

    fn insert(&mut self, template: EventTemplate) {
        match self.templates.iter_mut().find(|t| t.id == template.id) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.templates.len();
        self.templates.retain(|t| t.id != id);
        Ok(self.templates.len() != before)
    }

    fn add_excluded_date(&mut self, id: &str, date: NaiveDate) -> Result<()> {
        let template = self
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| EngineError::TemplateNotFound(id.to_string()))?;
        template.excluded_dates.insert(date);
        Ok(())
    }
}

/// What "delete this occurrence" means for a given occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccurrenceDeletion {
    /// Drop one date from a series.
    ExcludeDate { template_id: String, date: NaiveDate },
    /// Drop a single event's template.
    DeleteTemplate { template_id: String },
}

impl OccurrenceDeletion {
    pub fn for_occurrence(occurrence: &Occurrence) -> Self {
        let (template_id, date) = occurrence.key();
        let template_id = template_id.to_owned();
        if occurrence.is_recurring_instance {
            Self::ExcludeDate { template_id, date }
        } else {
            Self::DeleteTemplate { template_id }
        }
    }

    /// Apply the deletion to `store`.
    pub fn apply<S: EventStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        match self {
            Self::ExcludeDate { template_id, date } => store.add_excluded_date(template_id, *date),
            Self::DeleteTemplate { template_id } => {
                if store.delete(template_id)? {
                    Ok(())
                } else {
                    Err(EngineError::TemplateNotFound(template_id.clone()))
                }
            }
        }
    }
}

/// Query `store` for `range` and expand the result: the full
/// store → expander pipeline.
pub fn expand_from_store<S: EventStore + ?Sized>(
    store: &S,
    range: &DateRange,
    options: &ExpandOptions,
) -> Result<Vec<Occurrence>> {
    let templates = store.query(range)?;
    debug!(candidates = templates.len(), start = %range.start, end = %range.end, "store query");
    Ok(expand_with_options(&templates, range.start, range.end, options))
}
