//! Skill rating engine.
//!
//! Ratings live on a compressed 1.0–7.0 scale. Results are scored with a
//! classic Elo update where one rating level is worth
//! [`ELO_POINTS_PER_LEVEL`] Elo points, so a team one level stronger is
//! expected to win roughly three games out of four.
//!
//! Everything here is pure: the engine returns new ratings and the caller
//! persists them.
//!
//! ## Example
//!
//! ```
//! use courtside::rating::{KFactor, PlayerRating, update_ratings};
//!
//! let team_a = [PlayerRating::new(1, 3.0), PlayerRating::new(2, 3.4)];
//! let team_b = [PlayerRating::new(3, 3.2), PlayerRating::new(4, 3.2)];
//!
//! let update = update_ratings(&team_a, &team_b, 6, 3, KFactor::TOURNAMENT).unwrap();
//! assert!(update.delta_a > 0.0);
//! assert!((update.delta_a + update.delta_b).abs() < 1e-12);
//! ```

pub mod engine;

pub use engine::{
    ELO_POINTS_PER_LEVEL, KFactor, MAX_RATING, MIN_RATING, PlayerRating, RatingChange,
    RatingError, RatingResult, RatingUpdate, clamp_rating, expected_score, outcome_from_scores,
    rating_change, team_average, update_ratings,
};
