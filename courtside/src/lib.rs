//! # Courtside
//!
//! Tournament core of a racquet-sports club platform. It turns registered
//! players and teams into brackets or round-robin schedules, places matches
//! on courts without double-booking, moves ratings from results, and stamps
//! recurring tournaments from templates.
//!
//! ## Core Modules
//!
//! - [`rating`]: Elo-style expected score and rating updates on the 1.0–7.0 scale
//! - [`eligibility`]: rating bands and per-category eligibility reports
//! - [`bracket`]: seeding and bracket generation per format
//! - [`advancement`]: match state machine and winner propagation
//! - [`scheduling`]: court and time slot allocation
//! - [`recurrence`]: occurrence dates of recurring templates
//! - [`tournament`]: the orchestrating [`TournamentManager`]
//! - [`db`]: repository traits with PostgreSQL and in-memory stores
//! - [`booking`]: court availability
//! - [`auth`]: caller identity and access tokens

pub mod advancement;
pub mod auth;
pub mod booking;
pub mod bracket;
pub mod db;
pub mod eligibility;
pub mod rating;
pub mod recurrence;
pub mod scheduling;
pub mod tournament;

pub use auth::Principal;
pub use tournament::{TournamentError, TournamentManager, TournamentResult};
