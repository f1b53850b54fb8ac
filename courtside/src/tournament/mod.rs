//! Tournament orchestration.
//!
//! [`TournamentManager`] drives a tournament through its lifecycle:
//! registration gated by eligibility, bracket generation when registration
//! closes, court scheduling, match results with rating updates, and
//! cancellation. It also stamps instances from recurring templates.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{Duration, TimeZone, Utc};
//! use courtside::auth::Principal;
//! use courtside::booking::AlwaysFree;
//! use courtside::db::MemoryStore;
//! use courtside::tournament::{CoreConfig, TournamentConfig, TournamentManager};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = TournamentManager::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(AlwaysFree),
//!     CoreConfig::default(),
//! );
//!
//! let starts = Utc.with_ymd_and_hms(2026, 6, 6, 9, 0, 0).unwrap();
//! let ends = starts + Duration::hours(4);
//! let config = TournamentConfig::americano("Saturday Social", starts, ends, 8);
//! let tournament = manager.create_tournament(config).await?;
//! manager.open_registration(tournament.id).await?;
//!
//! let info = manager.get_tournament_info(tournament.id).await?;
//! let open = info.categories[0].id;
//! for user in 1..=4 {
//!     manager.register(tournament.id, open, &Principal::player(user, 3.0), None).await?;
//! }
//!
//! let matches = manager.close_registration(tournament.id, 2).await?;
//! assert_eq!(matches.len(), 6);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod manager;
pub mod models;

pub use config::CoreConfig;
pub use errors::{Entity, TournamentError, TournamentResult};
pub use manager::TournamentManager;
pub use models::{
    BracketSide, BulkRegistrationReport, Category, CategoryConfig, CategoryId, CourtAssignment,
    CourtId, Match, MatchId, MatchOutcome, MatchSlot, MatchStatus, NewParticipant, NewTournament,
    Participant, ParticipantId, RegistrationFailure, RegistrationRequest, ScheduleOutcome,
    ScheduleRequest, TeamSize, Tournament, TournamentConfig, TournamentFormat, TournamentId,
    TournamentInfo, TournamentStatus, UserId,
};
