//! # recurrence-engine
//!
//! Deterministic expansion of recurring calendar events.
//!
//! Given stored event templates (a start date, an optional recurrence rule,
//! interval, end date or count, and excluded dates), the engine enumerates
//! every concrete occurrence inside a date window. All arithmetic is on naive
//! local dates, so a date is never shifted by a timezone conversion.
//!
//! ## Modules
//!
//! - [`expander`]: templates + window → occurrences
//! - [`model`]: templates, raw store rows, occurrences
//! - [`day_view`]: per-day rendering of multi-day occurrences and display order
//! - [`describe`]: human-readable recurrence sentences
//! - [`store`]: the persistence seam and an in-memory store
//! - [`ical`]: RFC 5545 `RRULE` export, checked with the `rrule` crate
//! - [`dates`]: naive date helpers
//! - [`error`]: Error types

pub mod dates;
pub mod day_view;
pub mod describe;
pub mod error;
pub mod expander;
pub mod ical;
pub mod model;
pub mod store;

pub use day_view::{entries_for_day, group_by_day, resolve_for_day, DayEntry, SpanPosition};
pub use describe::describe_recurrence;
pub use error::{EngineError, Result};
pub use expander::{
    expand, expand_rows, expand_template, expand_with_options, series_dates, templates_from_rows,
    ExpandOptions, DEFAULT_MAX_GENERATED,
};
pub use ical::{rrule_dates, to_ical_lines, to_rrule_set, to_rrule_string};
pub use model::{
    EventTemplate, NthWeek, Occurrence, RawDays, RawScalar, RecurrenceRule, TemplateRow,
    WeekdayTag,
};
pub use store::{expand_from_store, DateRange, EventStore, InMemoryEventStore, OccurrenceDeletion};
