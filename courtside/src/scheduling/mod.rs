//! Court allocation.
//!
//! The planner maps open matches onto `(court, slot)` pairs. Which courts are
//! usable is decided before planning, from the booking collaborator and the
//! active reservations; the planner itself is pure.
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use courtside::scheduling::{TimeSlot, plan};
//! use courtside::tournament::TournamentFormat;
//!
//! let start = Utc.with_ymd_and_hms(2026, 6, 6, 9, 0, 0).unwrap();
//! let slots = TimeSlot::consecutive(start, start + Duration::hours(4), Duration::hours(1));
//! let plan = plan(TournamentFormat::SingleElimination, &[], &slots, &[1, 2]).unwrap();
//! assert!(plan.assignments.is_empty());
//! ```

pub mod models;
pub mod planner;

pub use models::{
    BulkReservationReport, CourtReservation, MatchAssignment, NewReservation, ReservationFailure,
    ReservationKind, RoundSchedule, ScheduleError, SchedulePlan, ScheduleResult, ScheduleWarning,
    TimeSlot,
};
pub use planner::{
    plan, plan_within_blocks, required_matches, reservations_for, validate_slots,
};
