//! Tournament data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::eligibility::RatingBand;
use crate::rating::RatingChange;
use crate::scheduling::{BulkReservationReport, SchedulePlan, TimeSlot};

/// Tournament ID type
pub type TournamentId = i64;
/// Category ID type
pub type CategoryId = i64;
/// Participant ID type
pub type ParticipantId = i64;
/// Match ID type
pub type MatchId = i64;
/// User ID type (owned by the identity collaborator)
pub type UserId = i64;
/// Court ID type (owned by the club collaborator)
pub type CourtId = i64;

/// Competitive structure of a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentFormat {
    SingleElimination,
    DoubleElimination,
    /// Round robin with rotating individuals
    Americano,
    /// Round robin with fixed pairs
    FixedAmericano,
}

impl TournamentFormat {
    /// Whether matches feed forward into later rounds
    pub fn is_elimination(&self) -> bool {
        matches!(self, Self::SingleElimination | Self::DoubleElimination)
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::SingleElimination => "single_elimination",
            Self::DoubleElimination => "double_elimination",
            Self::Americano => "americano",
            Self::FixedAmericano => "fixed_americano",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "single_elimination" => Some(Self::SingleElimination),
            "double_elimination" => Some(Self::DoubleElimination),
            "americano" => Some(Self::Americano),
            "fixed_americano" => Some(Self::FixedAmericano),
            _ => None,
        }
    }
}

/// Number of players behind one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamSize {
    Individual,
    Doubles,
}

impl TeamSize {
    pub fn members(&self) -> usize {
        match self {
            Self::Individual => 1,
            Self::Doubles => 2,
        }
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Doubles => "doubles",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "individual" => Some(Self::Individual),
            "doubles" => Some(Self::Doubles),
            _ => None,
        }
    }
}

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    Draft,
    RegistrationOpen,
    RegistrationClosed,
    InProgress,
    Completed,
    Cancelled,
}

impl TournamentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Cancellation is reachable from every non-terminal status.
    pub fn can_transition_to(&self, next: TournamentStatus) -> bool {
        use TournamentStatus::*;
        match (self, next) {
            (Draft, RegistrationOpen)
            | (RegistrationOpen, RegistrationClosed)
            | (RegistrationClosed, InProgress)
            | (InProgress, Completed) => true,
            (current, Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Operation that moves a tournament into this status
    pub fn transition_verb(&self) -> &'static str {
        match self {
            Self::Draft => "return to draft",
            Self::RegistrationOpen => "open registration",
            Self::RegistrationClosed => "close registration",
            Self::InProgress => "start",
            Self::Completed => "complete",
            Self::Cancelled => "cancel",
        }
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::RegistrationOpen => "registration_open",
            Self::RegistrationClosed => "registration_closed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "registration_open" => Some(Self::RegistrationOpen),
            "registration_closed" => Some(Self::RegistrationClosed),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Category definition supplied when creating a tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub band: RatingBand,
    pub capacity: usize,
}

impl CategoryConfig {
    pub fn new(name: impl Into<String>, band: RatingBand, capacity: usize) -> Self {
        Self {
            name: name.into(),
            band,
            capacity,
        }
    }
}

/// Tournament configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentConfig {
    pub name: String,
    pub format: TournamentFormat,
    pub team_size: TeamSize,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub categories: Vec<CategoryConfig>,
}

impl TournamentConfig {
    /// Doubles single-elimination event over the four standard tiers
    pub fn doubles_knockout(
        name: impl Into<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        capacity_per_tier: usize,
    ) -> Self {
        Self {
            name: name.into(),
            format: TournamentFormat::SingleElimination,
            team_size: TeamSize::Doubles,
            starts_at,
            ends_at,
            categories: crate::eligibility::SkillTier::ALL
                .iter()
                .map(|tier| CategoryConfig::new(tier.name(), tier.band(), capacity_per_tier))
                .collect(),
        }
    }

    /// Individual americano with one open category
    pub fn americano(
        name: impl Into<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        capacity: usize,
    ) -> Self {
        Self {
            name: name.into(),
            format: TournamentFormat::Americano,
            team_size: TeamSize::Individual,
            starts_at,
            ends_at,
            categories: vec![CategoryConfig::new("Open", RatingBand::open(), capacity)],
        }
    }
}

/// A persisted tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub format: TournamentFormat,
    pub team_size: TeamSize,
    pub status: TournamentStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Set when stamped from a recurring template
    pub template_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Tournament row to insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTournament {
    pub config: TournamentConfig,
    pub status: TournamentStatus,
    pub template_id: Option<i64>,
}

/// A persisted skill category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub band: RatingBand,
    pub capacity: usize,
    pub registered_count: usize,
}

impl Category {
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.registered_count)
    }
}

/// A registered individual or team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    pub category_id: CategoryId,
    pub members: Vec<UserId>,
    /// Rating snapshot frozen at registration
    pub elo_at_registration: f64,
    pub seed: Option<u32>,
    pub registered_at: DateTime<Utc>,
}

impl Participant {
    pub fn is_team(&self) -> bool {
        self.members.len() > 1
    }
}

/// Participant row to insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewParticipant {
    pub tournament_id: TournamentId,
    pub category_id: CategoryId,
    pub members: Vec<UserId>,
    pub elo_at_registration: f64,
}

/// Which bracket a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketSide {
    /// Main draw (also used for round-robin matches)
    Main,
    Losers,
    GrandFinal,
}

impl BracketSide {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Losers => "losers",
            Self::GrandFinal => "grand_final",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "main" => Some(Self::Main),
            "losers" => Some(Self::Losers),
            "grand_final" => Some(Self::GrandFinal),
            _ => None,
        }
    }
}

/// One side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "participant_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchSlot {
    /// Waiting for an earlier match
    Tbd,
    /// No opponent will ever arrive
    Bye,
    Participant(ParticipantId),
}

impl MatchSlot {
    pub fn participant(&self) -> Option<ParticipantId> {
        match self {
            Self::Participant(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_tbd(&self) -> bool {
        matches!(self, Self::Tbd)
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Self::Bye)
    }

    /// Column pair used by the store: `(participant_id, is_bye)`
    pub fn to_columns(self) -> (Option<ParticipantId>, bool) {
        match self {
            Self::Tbd => (None, false),
            Self::Bye => (None, true),
            Self::Participant(id) => (Some(id), false),
        }
    }

    pub fn from_columns(participant_id: Option<ParticipantId>, is_bye: bool) -> Self {
        match (participant_id, is_bye) {
            (Some(id), _) => Self::Participant(id),
            (None, true) => Self::Bye,
            (None, false) => Self::Tbd,
        }
    }
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
    Walkover,
    Cancelled,
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Walkover | Self::Cancelled)
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Walkover => "walkover",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "walkover" => Some(Self::Walkover),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Court and time assigned to a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtAssignment {
    pub court_id: CourtId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// A persisted match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub category_id: CategoryId,
    pub bracket: BracketSide,
    pub round: u32,
    pub match_number: u32,
    pub team1: MatchSlot,
    pub team2: MatchSlot,
    pub status: MatchStatus,
    pub assignment: Option<CourtAssignment>,
    pub team1_score: Option<u32>,
    pub team2_score: Option<u32>,
    pub winner: Option<ParticipantId>,
    pub winner_advances_to: Option<MatchId>,
    pub loser_advances_to: Option<MatchId>,
}

impl Match {
    /// Both sides hold real participants
    pub fn is_resolved(&self) -> bool {
        self.team1.participant().is_some() && self.team2.participant().is_some()
    }

    pub fn participants(&self) -> Option<(ParticipantId, ParticipantId)> {
        Some((self.team1.participant()?, self.team2.participant()?))
    }

    /// Same slots, status, scores and winner; the court assignment is not
    /// compared
    pub fn same_progress(&self, other: &Match) -> bool {
        self.id == other.id
            && self.team1 == other.team1
            && self.team2 == other.team2
            && self.status == other.status
            && self.team1_score == other.team1_score
            && self.team2_score == other.team2_score
            && self.winner == other.winner
    }

    pub fn has_successor(&self) -> bool {
        self.winner_advances_to.is_some() || self.loser_advances_to.is_some()
    }
}

/// Summary returned to API callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentInfo {
    pub tournament: Tournament,
    pub categories: Vec<Category>,
    pub match_count: usize,
    pub completed_matches: usize,
}

/// One entry of an administrative bulk registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub category_id: CategoryId,
    pub members: Vec<UserId>,
}

/// Why one bulk registration entry was refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationFailure {
    pub members: Vec<UserId>,
    pub reason: String,
}

/// Per-entry outcome of a bulk registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkRegistrationReport {
    pub registered: Vec<Participant>,
    pub failed: Vec<RegistrationFailure>,
}

/// Input of a scheduling run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub courts: Vec<CourtId>,
    /// Explicit slots; when absent the tournament window is cut into slots
    /// of the configured length
    #[serde(default)]
    pub slots: Option<Vec<TimeSlot>>,
    /// Hold every used (court, slot) with a TOURNAMENT_BLOCK reservation
    #[serde(default)]
    pub reserve: bool,
}

/// What a scheduling run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub plan: SchedulePlan,
    pub reservations: BulkReservationReport,
}

/// What a match transition changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Every match the transition wrote, the reported match first
    pub matches: Vec<Match>,
    pub winner: Option<ParticipantId>,
    pub ratings: Vec<RatingChange>,
    /// The result finished the last open match of the tournament
    pub tournament_completed: bool,
}
