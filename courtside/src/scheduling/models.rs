//! Scheduling inputs, plans and court reservations.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tournament::models::{BracketSide, CourtId, MatchId, TournamentId};

/// Scheduling errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("no time slots were supplied")]
    NoSlots,

    #[error("no court is free for every slot")]
    NoCourts,

    #[error("slot {index} does not start on the hour")]
    MisalignedSlot { index: usize },

    #[error("slot {index} ends before it starts")]
    EmptySlot { index: usize },

    #[error("slot {index} overlaps or precedes the slot before it")]
    UnorderedSlot { index: usize },
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Half-open time window `[starts_at, ends_at)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        Self { starts_at, ends_at }
    }

    /// Back-to-back slots of `length` covering `[from, until)`
    pub fn consecutive(from: DateTime<Utc>, until: DateTime<Utc>, length: Duration) -> Vec<Self> {
        let mut slots = Vec::new();
        if length <= Duration::zero() {
            return slots;
        }
        let mut start = from;
        while start + length <= until {
            slots.push(Self::new(start, start + length));
            start += length;
        }
        slots
    }

    pub fn duration(&self) -> Duration {
        self.ends_at - self.starts_at
    }

    pub fn is_hour_aligned(&self) -> bool {
        self.starts_at.minute() == 0
            && self.starts_at.second() == 0
            && self.starts_at.nanosecond() == 0
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.starts_at < other.ends_at && other.starts_at < self.ends_at
    }
}

/// One match placed on a court
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAssignment {
    pub match_id: MatchId,
    pub court_id: CourtId,
    pub slot: TimeSlot,
}

/// Slot group given to one round (elimination) or one packed slot (round robin)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSchedule {
    pub bracket: BracketSide,
    pub round: u32,
    pub slots: Vec<TimeSlot>,
    pub courts: Vec<CourtId>,
    /// Open matches in the group, assigned or not
    pub matches: usize,
    /// Matches of the round that received a court
    pub assigned: usize,
    /// Matches still waiting for participants; their slots are held
    pub pending: usize,
}

/// Non-fatal scheduling findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleWarning {
    /// More matches than `slots x courts` can hold
    CapacityShortfall { total_matches: usize, capacity: usize },
    /// Elimination rounds that ran past the last slot
    RoundsUnplaced { rounds: Vec<u32> },
    /// Playable matches left without a court
    MatchesUnscheduled { matches: Vec<MatchId> },
}

/// Output of the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePlan {
    pub rounds: Vec<RoundSchedule>,
    pub assignments: Vec<MatchAssignment>,
    /// Playable matches that did not fit
    pub unscheduled: Vec<MatchId>,
    pub total_matches: usize,
    pub total_slots: usize,
    pub courts_per_slot: usize,
    pub courts_required: usize,
    /// From the first slot start to the end of the last slot in use
    pub estimated_minutes: i64,
    pub warnings: Vec<ScheduleWarning>,
}

impl RoundSchedule {
    /// Courts held in the `index`-th slot of this group
    pub fn courts_in_slot(&self, index: usize) -> &[CourtId] {
        let per_slot = self.courts.len();
        let used = self
            .matches
            .saturating_sub(index * per_slot)
            .min(per_slot);
        &self.courts[..used]
    }
}

impl SchedulePlan {
    pub fn assignment_for(&self, match_id: MatchId) -> Option<&MatchAssignment> {
        self.assignments.iter().find(|a| a.match_id == match_id)
    }

    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty() && self.warnings.is_empty()
    }
}

/// Reservation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationKind {
    Regular,
    TournamentBlock,
}

impl ReservationKind {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::TournamentBlock => "tournament_block",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "regular" => Some(Self::Regular),
            "tournament_block" => Some(Self::TournamentBlock),
            _ => None,
        }
    }
}

/// A persisted court booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtReservation {
    pub id: i64,
    pub court_id: CourtId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub kind: ReservationKind,
    pub tournament_id: Option<TournamentId>,
    pub active: bool,
}

impl CourtReservation {
    /// Active and intersecting `[starts_at, ends_at)` on the same court
    pub fn blocks(
        &self,
        court_id: CourtId,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> bool {
        self.active
            && self.court_id == court_id
            && self.starts_at < ends_at
            && starts_at < self.ends_at
    }
}

/// Reservation to insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    pub court_id: CourtId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub kind: ReservationKind,
    pub tournament_id: Option<TournamentId>,
}

impl NewReservation {
    pub fn tournament_block(
        tournament_id: TournamentId,
        court_id: CourtId,
        slot: TimeSlot,
    ) -> Self {
        Self {
            court_id,
            starts_at: slot.starts_at,
            ends_at: slot.ends_at,
            kind: ReservationKind::TournamentBlock,
            tournament_id: Some(tournament_id),
        }
    }
}

/// A reservation the store refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationFailure {
    pub court_id: CourtId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub reason: String,
}

/// Result of a bulk reservation request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReservationReport {
    pub created: Vec<CourtReservation>,
    pub failed: Vec<ReservationFailure>,
}

impl BulkReservationReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 7, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_consecutive_slots() {
        let slots = TimeSlot::consecutive(at(9, 0), at(12, 30), Duration::hours(1));
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[2], TimeSlot::new(at(11, 0), at(12, 0)));
        assert!(slots.iter().all(TimeSlot::is_hour_aligned));
    }

    #[test]
    fn test_slot_overlap_is_half_open() {
        let a = TimeSlot::new(at(9, 0), at(10, 0));
        let b = TimeSlot::new(at(10, 0), at(11, 0));
        let c = TimeSlot::new(at(9, 30), at(10, 30));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_reservation_blocks() {
        let reservation = CourtReservation {
            id: 1,
            court_id: 3,
            starts_at: at(9, 0),
            ends_at: at(10, 0),
            kind: ReservationKind::Regular,
            tournament_id: None,
            active: true,
        };
        assert!(reservation.blocks(3, at(9, 30), at(11, 0)));
        assert!(!reservation.blocks(3, at(10, 0), at(11, 0)));
        assert!(!reservation.blocks(4, at(9, 0), at(10, 0)));

        let inactive = CourtReservation {
            active: false,
            ..reservation
        };
        assert!(!inactive.blocks(3, at(9, 0), at(10, 0)));
    }
}
