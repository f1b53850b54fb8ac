//! Match advancement state machine.
//!
//! Matches move `SCHEDULED -> IN_PROGRESS -> {COMPLETED, WALKOVER, CANCELLED}`.
//! Completing a match writes the winner (and, in double elimination, the
//! loser) into the next match, resolving BYE walkovers along the way.
//!
//! ```
//! use courtside::advancement::{MatchArena, MatchResult, complete};
//! # use courtside::tournament::models::*;
//! # fn m(id: i64, t1: MatchSlot, t2: MatchSlot, next: Option<i64>) -> Match {
//! #     Match { id, tournament_id: 1, category_id: 1, bracket: BracketSide::Main,
//! #         round: 1, match_number: id as u32, team1: t1, team2: t2,
//! #         status: MatchStatus::Scheduled, assignment: None, team1_score: None,
//! #         team2_score: None, winner: None, winner_advances_to: next,
//! #         loser_advances_to: None }
//! # }
//! let mut arena = MatchArena::new(vec![
//!     m(1, MatchSlot::Participant(7), MatchSlot::Participant(8), Some(2)),
//!     m(2, MatchSlot::Tbd, MatchSlot::Tbd, None),
//! ]);
//! let outcome = complete(&mut arena, 1, MatchResult::new(6, 4)).unwrap();
//! assert_eq!(outcome.winner, Some(7));
//! assert_eq!(arena.get(2).unwrap().team1, MatchSlot::Participant(7));
//! ```

pub mod arena;
pub mod state_machine;

pub use arena::MatchArena;
pub use state_machine::{
    Advancement, AdvancementError, AdvancementResult, MatchResult, RatedPair, cancel, complete,
    start, walkover,
};
