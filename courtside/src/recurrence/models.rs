//! Recurring tournament templates.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tournament::models::{
    CategoryConfig, TeamSize, TournamentConfig, TournamentFormat, TournamentId,
};

pub type TemplateId = i64;

/// Longest generation window a template may ask for
pub const MAX_ADVANCE_DAYS: u32 = 366;

/// Longest instance a template may stamp: one week
pub const MAX_DURATION_MINUTES: i64 = 7 * 24 * 60;

/// Recurrence errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("interval must be at least 1")]
    ZeroInterval,

    #[error("a weekly pattern needs at least one weekday")]
    NoWeekdays,

    #[error("day of month {0} is outside 1..=31")]
    InvalidDayOfMonth(u32),

    #[error("series ends on {end} before it starts on {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("generation window ends before it starts")]
    EmptyWindow,

    #[error("template {0} has no categories")]
    NoCategories(TemplateId),

    #[error("advance window of {days} days exceeds {max}")]
    AdvanceTooFar { days: u32, max: u32 },

    #[error("duration of {minutes} minutes is outside 1..={max}")]
    InvalidDuration { minutes: i64, max: i64 },

    #[error("dates after {0} cannot be represented")]
    OutOfRange(DateTime<Utc>),
}

pub type RecurrenceResult<T> = Result<T, RecurrenceError>;

/// How often a template repeats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrencePattern {
    /// Listed weekdays of every Nth week
    Weekly { weekdays: Vec<Weekday> },
    /// Given day of every Nth month, clamped to short months
    Monthly { day_of_month: u32 },
    /// Every N days
    Custom,
}

impl RecurrencePattern {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Weekly { .. } => "weekly",
            Self::Monthly { .. } => "monthly",
            Self::Custom => "custom",
        }
    }
}

/// When a series runs. All times are UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub pattern: RecurrencePattern,
    pub interval: u32,
    pub starts_on: NaiveDate,
    pub time_of_day: NaiveTime,
    pub ends_on: Option<NaiveDate>,
    /// Cap on instances over the whole series
    pub max_occurrences: Option<u32>,
}

impl RecurrenceRule {
    pub fn weekly(weekdays: Vec<Weekday>, starts_on: NaiveDate, time_of_day: NaiveTime) -> Self {
        Self {
            pattern: RecurrencePattern::Weekly { weekdays },
            interval: 1,
            starts_on,
            time_of_day,
            ends_on: None,
            max_occurrences: None,
        }
    }

    pub fn monthly(day_of_month: u32, starts_on: NaiveDate, time_of_day: NaiveTime) -> Self {
        Self {
            pattern: RecurrencePattern::Monthly { day_of_month },
            interval: 1,
            starts_on,
            time_of_day,
            ends_on: None,
            max_occurrences: None,
        }
    }

    pub fn every_days(days: u32, starts_on: NaiveDate, time_of_day: NaiveTime) -> Self {
        Self {
            pattern: RecurrencePattern::Custom,
            interval: days,
            starts_on,
            time_of_day,
            ends_on: None,
            max_occurrences: None,
        }
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn until(mut self, ends_on: NaiveDate) -> Self {
        self.ends_on = Some(ends_on);
        self
    }

    pub fn limit(mut self, max_occurrences: u32) -> Self {
        self.max_occurrences = Some(max_occurrences);
        self
    }
}

/// What every stamped instance looks like
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentBlueprint {
    pub name: String,
    pub format: TournamentFormat,
    pub team_size: TeamSize,
    pub duration_minutes: i64,
    pub categories: Vec<CategoryConfig>,
    /// Stamp instances straight into REGISTRATION_OPEN
    #[serde(default)]
    pub open_registration: bool,
}

impl TournamentBlueprint {
    pub fn validate(&self) -> RecurrenceResult<()> {
        if !(1..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(RecurrenceError::InvalidDuration {
                minutes: self.duration_minutes,
                max: MAX_DURATION_MINUTES,
            });
        }
        Ok(())
    }

    /// Configuration of the instance starting at `starts_at`
    pub fn instance_config(&self, starts_at: DateTime<Utc>) -> RecurrenceResult<TournamentConfig> {
        let ends_at = Duration::try_minutes(self.duration_minutes)
            .and_then(|length| starts_at.checked_add_signed(length))
            .ok_or(RecurrenceError::OutOfRange(starts_at))?;
        Ok(TournamentConfig {
            name: format!("{} {}", self.name, starts_at.format("%Y-%m-%d")),
            format: self.format,
            team_size: self.team_size,
            starts_at,
            ends_at,
            categories: self.categories.clone(),
        })
    }
}

/// A persisted template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTournamentTemplate {
    pub id: TemplateId,
    pub rule: RecurrenceRule,
    pub advance_days: u32,
    pub active: bool,
    pub blueprint: TournamentBlueprint,
    pub created_at: DateTime<Utc>,
}

/// Template to insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub rule: RecurrenceRule,
    pub advance_days: u32,
    pub blueprint: TournamentBlueprint,
}

/// `[from, until)` span in which instances are stamped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationWindow {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl GenerationWindow {
    /// `now .. now + days`
    pub fn ahead(now: DateTime<Utc>, days: u32) -> RecurrenceResult<Self> {
        let until = Duration::try_days(i64::from(days))
            .and_then(|span| now.checked_add_signed(span))
            .ok_or(RecurrenceError::OutOfRange(now))?;
        Ok(Self { from: now, until })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.until
    }
}

/// One date in a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// 1-based position in the whole series
    pub index: u32,
    pub starts_at: DateTime<Utc>,
}

/// Outcome of stamping one template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub template_id: TemplateId,
    pub created: Vec<TournamentId>,
    /// Dates that already had an instance
    pub skipped: Vec<DateTime<Utc>>,
}
