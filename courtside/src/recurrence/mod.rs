//! Recurring tournaments.
//!
//! A template pairs a [`RecurrenceRule`] with a [`TournamentBlueprint`]. The
//! calculator lists the dates inside a generation window that do not have an
//! instance yet; the orchestrator stamps one tournament per date.
//!
//! ```
//! use std::collections::HashSet;
//! use chrono::{NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
//! use courtside::recurrence::{GenerationWindow, RecurrenceRule, occurrences};
//!
//! let monday = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
//! let rule = RecurrenceRule::weekly(
//!     vec![Weekday::Mon, Weekday::Wed],
//!     monday,
//!     NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
//! );
//! let now = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
//! let window = GenerationWindow::ahead(now, 14).unwrap();
//! let found = occurrences(&rule, &window, &HashSet::new()).unwrap();
//! assert_eq!(found.len(), 4);
//! ```

pub mod calculator;
pub mod models;

pub use calculator::{
    Series, last_day_of_month, next_occurrence, occurrences, validate_rule, week_start,
};
pub use models::{
    GenerationReport, GenerationWindow, MAX_ADVANCE_DAYS, MAX_DURATION_MINUTES, NewTemplate,
    Occurrence, RecurrenceError, RecurrencePattern, RecurrenceResult, RecurrenceRule,
    RecurringTournamentTemplate, TemplateId, TournamentBlueprint,
};
