//! Repository trait definitions for testability and dependency injection.
//!
//! Every method that changes more than one row runs as a single unit of
//! work: either all of it is visible afterwards or none of it is.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bracket::BracketPlan;
use crate::rating::RatingChange;
use crate::recurrence::{NewTemplate, RecurringTournamentTemplate, TemplateId};
use crate::scheduling::{BulkReservationReport, CourtReservation, MatchAssignment, NewReservation};
use crate::tournament::errors::TournamentResult;
use crate::tournament::models::{
    Category, CategoryId, CourtId, Match, MatchId, NewParticipant, NewTournament, Participant,
    ParticipantId, Tournament, TournamentId, TournamentStatus, UserId,
};

/// Seeds and generated brackets for a tournament whose registration closes
#[derive(Debug, Clone, PartialEq)]
pub struct BracketWrite {
    pub tournament_id: TournamentId,
    pub seeds: Vec<(ParticipantId, u32)>,
    pub plans: Vec<(CategoryId, BracketPlan)>,
}

/// Everything a match result changes
#[derive(Debug, Clone, PartialEq)]
pub struct ResultWrite {
    pub tournament_id: TournamentId,
    /// The match the result was reported for
    pub trigger: MatchId,
    /// Every touched match as it was read before the result was applied.
    /// The write is refused if any of them has moved on since.
    pub previous: Vec<Match>,
    /// Final state of every match the result touched
    pub matches: Vec<Match>,
    /// `before` must still be the stored rating, when one is stored
    pub ratings: Vec<RatingChange>,
}

/// What a cancellation released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReport {
    pub cancelled_matches: usize,
    pub released_reservations: usize,
}

/// One persisted rating movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingHistoryEntry {
    pub user_id: UserId,
    pub match_id: Option<MatchId>,
    pub before: f64,
    pub after: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Trait for tournament, category and participant operations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Insert a tournament with its categories
    async fn create_tournament(&self, new: &NewTournament) -> TournamentResult<Tournament>;

    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>>;

    /// Move from `from` to `to`, failing with `InvalidState` if the stored
    /// status is no longer `from`
    async fn transition_status(
        &self,
        id: TournamentId,
        from: TournamentStatus,
        to: TournamentStatus,
    ) -> TournamentResult<Tournament>;

    /// Release reservations, cancel open matches and mark the tournament
    /// CANCELLED together
    async fn cancel_tournament(&self, id: TournamentId) -> TournamentResult<CancellationReport>;

    /// Categories with their current registration counts
    async fn list_categories(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Category>>;

    /// Capacity-checked insert; rejects members already registered in the
    /// same tournament
    async fn register_participant(&self, new: &NewParticipant) -> TournamentResult<Participant>;

    async fn remove_participant(&self, participant_id: ParticipantId) -> TournamentResult<()>;

    async fn get_participant(
        &self,
        participant_id: ParticipantId,
    ) -> TournamentResult<Option<Participant>>;

    async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Participant>>;
}

/// Trait for match operations
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Persist seeds and brackets and close registration
    async fn commit_brackets(&self, write: &BracketWrite) -> TournamentResult<Vec<Match>>;

    async fn get_match(&self, id: MatchId) -> TournamentResult<Option<Match>>;

    async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>>;

    /// Apply a match result, guarded by compare-and-set on every touched
    /// match and rating. Fails with `ConcurrentUpdate` when another write got
    /// there first. Returns whether the tournament is now completed.
    async fn record_result(&self, write: &ResultWrite) -> TournamentResult<bool>;

    /// Write court assignments and materialize reservations. Reservations
    /// are validated one by one; those that fail are reported, the rest are
    /// kept.
    async fn commit_schedule(
        &self,
        assignments: &[MatchAssignment],
        reservations: &[NewReservation],
    ) -> TournamentResult<BulkReservationReport>;
}

/// Trait for court reservation operations
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Active reservations intersecting `[from, until)`, optionally for one court
    async fn active_reservations(
        &self,
        court_id: Option<CourtId>,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> TournamentResult<Vec<CourtReservation>>;

    async fn create_reservations(
        &self,
        batch: &[NewReservation],
    ) -> TournamentResult<BulkReservationReport>;

    async fn tournament_reservations(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<CourtReservation>>;
}

/// Trait for recurring template operations
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn create_template(&self, new: &NewTemplate)
    -> TournamentResult<RecurringTournamentTemplate>;

    async fn get_template(
        &self,
        id: TemplateId,
    ) -> TournamentResult<Option<RecurringTournamentTemplate>>;

    async fn list_templates(
        &self,
        active_only: bool,
    ) -> TournamentResult<Vec<RecurringTournamentTemplate>>;

    async fn set_template_active(&self, id: TemplateId, active: bool) -> TournamentResult<()>;

    /// Start times of instances already stamped from the template
    async fn instance_starts(&self, id: TemplateId) -> TournamentResult<HashSet<DateTime<Utc>>>;

    /// Insert an instance unless one with the same start already exists
    async fn stamp_instance(
        &self,
        id: TemplateId,
        new: &NewTournament,
    ) -> TournamentResult<Option<Tournament>>;
}

/// Trait for player rating operations
#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Stored ratings; users without a row are absent from the map
    async fn get_ratings(&self, user_ids: &[UserId]) -> TournamentResult<HashMap<UserId, f64>>;

    async fn set_rating(&self, user_id: UserId, rating: f64) -> TournamentResult<()>;

    async fn rating_history(&self, user_id: UserId) -> TournamentResult<Vec<RatingHistoryEntry>>;
}

/// Everything the tournament core needs from persistence
pub trait Store:
    TournamentRepository
    + MatchRepository
    + ReservationRepository
    + TemplateRepository
    + RatingRepository
{
}

impl<T> Store for T where
    T: TournamentRepository
        + MatchRepository
        + ReservationRepository
        + TemplateRepository
        + RatingRepository
{
}
