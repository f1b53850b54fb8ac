//! Bracket generation.
//!
//! Turns a seeded participant list into a match graph for one category:
//! a knockout tree (single or simplified double elimination) or a packed
//! round robin. The result is a [`BracketPlan`], a flat arena whose forward
//! pointers are [`MatchKey`] indices; the store maps keys to match ids when
//! the plan is persisted.
//!
//! ## Example
//!
//! ```
//! use courtside::bracket::{BracketGenerator, GenerateBracket, SeededEntry};
//! use courtside::tournament::TournamentFormat;
//!
//! let seeded: Vec<SeededEntry> = (1..=5)
//!     .map(|i| SeededEntry { participant_id: i, seed: i as u32, rating: 4.0 })
//!     .collect();
//!
//! let plan = BracketGenerator::for_format(TournamentFormat::SingleElimination, 2)
//!     .generate(&seeded)
//!     .unwrap();
//! assert_eq!(plan.main_rounds, 3);
//! assert_eq!(plan.matches.len(), 7);
//! ```

pub mod generator;
pub mod models;
pub mod seeding;

pub use generator::{
    BracketGenerator, DoubleElimination, GenerateBracket, RoundRobin, SingleElimination,
    circle_pairings, draw_order, elimination_rounds,
};
pub use models::{BracketError, BracketPlan, BracketResult, MatchKey, PlannedMatch, SeededEntry};
pub use seeding::seed_participants;
