//! Tournament error types.

use thiserror::Error;

use super::models::{CategoryId, MatchId, TournamentId, TournamentStatus, UserId};
use crate::advancement::AdvancementError;
use crate::bracket::BracketError;
use crate::db::timeouts::TimeoutError;
use crate::eligibility::{CategoryExclusion, EligibilityError};
use crate::rating::RatingError;
use crate::recurrence::{RecurrenceError, TemplateId};
use crate::scheduling::ScheduleError;

/// What a lookup was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Tournament(TournamentId),
    Category(CategoryId),
    Participant(i64),
    Match(MatchId),
    Template(TemplateId),
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tournament(id) => write!(f, "tournament {id}"),
            Self::Category(id) => write!(f, "category {id}"),
            Self::Participant(id) => write!(f, "participant {id}"),
            Self::Match(id) => write!(f, "match {id}"),
            Self::Template(id) => write!(f, "template {id}"),
        }
    }
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Not found: {0}")]
    NotFound(Entity),

    #[error("Tournament {tournament_id} is {status:?}, cannot {operation}")]
    InvalidState {
        tournament_id: TournamentId,
        status: TournamentStatus,
        operation: &'static str,
    },

    #[error("Category {category_id} is full ({capacity} places)")]
    CapacityExceeded {
        category_id: CategoryId,
        capacity: usize,
    },

    #[error("Rating {rating:.2} does not fit the requested category")]
    IneligibleRating {
        rating: f64,
        exclusions: Vec<CategoryExclusion>,
    },

    #[error("Scheduling infeasible: {0}")]
    SchedulingInfeasible(String),

    #[error("Court {court_id} is already reserved in that window")]
    ConflictingReservation { court_id: i64 },

    #[error("User {0} is already registered in this tournament")]
    AlreadyRegistered(UserId),

    #[error("Match {0} was changed concurrently")]
    ConcurrentUpdate(MatchId),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rating error: {0}")]
    Rating(#[from] RatingError),

    #[error("Eligibility error: {0}")]
    Eligibility(#[from] EligibilityError),

    #[error("Bracket error: {0}")]
    Bracket(#[from] BracketError),

    #[error("Schedule error: {0}")]
    Schedule(ScheduleError),

    #[error("Recurrence error: {0}")]
    Recurrence(#[from] RecurrenceError),

    #[error("Match error: {0}")]
    Advancement(#[from] AdvancementError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

impl From<ScheduleError> for TournamentError {
    fn from(err: ScheduleError) -> Self {
        match err {
            e @ (ScheduleError::NoSlots | ScheduleError::NoCourts) => {
                TournamentError::SchedulingInfeasible(e.to_string())
            }
            other => TournamentError::Schedule(other),
        }
    }
}

impl From<TimeoutError> for TournamentError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Database(e) => TournamentError::Database(e),
            TimeoutError::Timeout(after) => {
                TournamentError::Timeout(format!("database operation exceeded {after:?}"))
            }
        }
    }
}

impl TournamentError {
    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_)
            | TournamentError::Serialization(_)
            | TournamentError::CorruptRow(_) => "Internal server error".to_string(),
            TournamentError::Timeout(_) => "Service temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    /// Worth retrying unchanged
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TournamentError::Timeout(_)
                | TournamentError::ConcurrentUpdate(_)
                | TournamentError::Database(_)
        )
    }
}

pub type TournamentResult<T> = Result<T, TournamentError>;
