//! Expected-score and rating-delta computation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tournament::models::UserId;

/// Lowest rating a player can hold
pub const MIN_RATING: f64 = 1.0;

/// Highest rating a player can hold
pub const MAX_RATING: f64 = 7.0;

/// Classic Elo points represented by one level of the 1.0–7.0 scale
pub const ELO_POINTS_PER_LEVEL: f64 = 200.0;

/// Elo logistic spread (rating gap that yields 10:1 odds)
const ELO_SPREAD: f64 = 400.0;

/// Rating engine errors
#[derive(Debug, Error, PartialEq)]
pub enum RatingError {
    #[error("team {0} has no members")]
    EmptyTeam(char),

    #[error("rating {0} is not a finite number")]
    NotFinite(f64),
}

pub type RatingResult<T> = Result<T, RatingError>;

/// Multiplier controlling how far one result moves a rating
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct KFactor(pub f64);

impl KFactor {
    /// Casual and league play
    pub const STANDARD: KFactor = KFactor(32.0);
    /// Tournament matches weigh more than casual play
    pub const TOURNAMENT: KFactor = KFactor(40.0);
}

impl Default for KFactor {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// A player's rating snapshot going into a match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerRating {
    pub user_id: UserId,
    pub rating: f64,
}

impl PlayerRating {
    pub fn new(user_id: UserId, rating: f64) -> Self {
        Self { user_id, rating }
    }
}

/// Before/after rating for one player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub user_id: UserId,
    pub before: f64,
    pub after: f64,
}

/// Result of rating a two-team match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    /// Level delta applied to every member of team A (before clamping)
    pub delta_a: f64,
    /// Level delta applied to every member of team B (before clamping)
    pub delta_b: f64,
    pub changes: Vec<RatingChange>,
}

/// Probability-like expectation that `a` beats `b`.
///
/// Symmetric: `expected_score(a, b) + expected_score(b, a) == 1`.
pub fn expected_score(a: f64, b: f64) -> f64 {
    let gap = (b - a) * ELO_POINTS_PER_LEVEL / ELO_SPREAD;
    1.0 / (1.0 + 10_f64.powf(gap))
}

/// Raw rating change in Elo points: `k * (actual - expected)`.
pub fn rating_change(expected: f64, actual: f64, k: KFactor) -> f64 {
    k.0 * (actual - expected)
}

/// Keep a rating inside `[MIN_RATING, MAX_RATING]`
pub fn clamp_rating(rating: f64) -> f64 {
    rating.clamp(MIN_RATING, MAX_RATING)
}

/// Actual score for side A: 1 for a win, 0.5 for a draw, 0 for a loss
pub fn outcome_from_scores(score_a: u32, score_b: u32) -> f64 {
    match score_a.cmp(&score_b) {
        std::cmp::Ordering::Greater => 1.0,
        std::cmp::Ordering::Equal => 0.5,
        std::cmp::Ordering::Less => 0.0,
    }
}

/// Mean rating of a team
pub fn team_average(team: &[PlayerRating]) -> Option<f64> {
    if team.is_empty() {
        return None;
    }
    Some(team.iter().map(|p| p.rating).sum::<f64>() / team.len() as f64)
}

/// Rate a finished match between two teams.
///
/// The delta is computed once per team from the team averages and applied to
/// every member, then each member is clamped into the rating range.
pub fn update_ratings(
    team_a: &[PlayerRating],
    team_b: &[PlayerRating],
    score_a: u32,
    score_b: u32,
    k: KFactor,
) -> RatingResult<RatingUpdate> {
    if let Some(bad) = team_a
        .iter()
        .chain(team_b)
        .find(|p| !p.rating.is_finite())
    {
        return Err(RatingError::NotFinite(bad.rating));
    }

    let avg_a = team_average(team_a).ok_or(RatingError::EmptyTeam('A'))?;
    let avg_b = team_average(team_b).ok_or(RatingError::EmptyTeam('B'))?;

    let actual_a = outcome_from_scores(score_a, score_b);
    let delta_a = rating_change(expected_score(avg_a, avg_b), actual_a, k) / ELO_POINTS_PER_LEVEL;
    let delta_b =
        rating_change(expected_score(avg_b, avg_a), 1.0 - actual_a, k) / ELO_POINTS_PER_LEVEL;

    let apply = |team: &[PlayerRating], delta: f64| -> Vec<RatingChange> {
        team.iter()
            .map(|p| RatingChange {
                user_id: p.user_id,
                before: p.rating,
                after: clamp_rating(p.rating + delta),
            })
            .collect()
    };

    let mut changes = apply(team_a, delta_a);
    changes.extend(apply(team_b, delta_b));

    Ok(RatingUpdate {
        delta_a,
        delta_b,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(ratings: &[(UserId, f64)]) -> Vec<PlayerRating> {
        ratings
            .iter()
            .map(|&(id, r)| PlayerRating::new(id, r))
            .collect()
    }

    #[test]
    fn test_expected_score_equal_ratings() {
        assert!((expected_score(3.5, 3.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_expected_score_favours_stronger_side() {
        let e = expected_score(4.0, 3.0);
        assert!(e > 0.7 && e < 0.8, "one level up should be ~0.76, got {e}");
        assert!(expected_score(4.5, 3.0) > e);
    }

    #[test]
    fn test_rating_change_formula() {
        assert_eq!(rating_change(0.5, 1.0, KFactor::STANDARD), 16.0);
        assert_eq!(rating_change(0.5, 0.0, KFactor::TOURNAMENT), -20.0);
        assert_eq!(rating_change(0.5, 0.5, KFactor::TOURNAMENT), 0.0);
    }

    #[test]
    fn test_tournament_k_is_larger() {
        assert!(KFactor::TOURNAMENT > KFactor::STANDARD);
    }

    #[test]
    fn test_equal_teams_zero_sum() {
        let a = team(&[(1, 3.0), (2, 4.0)]);
        let b = team(&[(3, 3.5), (4, 3.5)]);
        let update = update_ratings(&a, &b, 6, 2, KFactor::STANDARD).unwrap();

        assert!(update.delta_a > 0.0);
        assert!((update.delta_a + update.delta_b).abs() < 1e-12);
        // 16 Elo points at 200 points per level
        assert!((update.delta_a - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_same_delta_for_every_member() {
        let a = team(&[(1, 2.0), (2, 5.0)]);
        let b = team(&[(3, 3.0), (4, 3.0)]);
        let update = update_ratings(&a, &b, 1, 6, KFactor::TOURNAMENT).unwrap();

        let member_1 = update.changes.iter().find(|c| c.user_id == 1).unwrap();
        let member_2 = update.changes.iter().find(|c| c.user_id == 2).unwrap();
        assert!(
            ((member_1.after - member_1.before) - (member_2.after - member_2.before)).abs() < 1e-12
        );
    }

    #[test]
    fn test_draw_between_equals_changes_nothing() {
        let a = team(&[(1, 3.0)]);
        let b = team(&[(2, 3.0)]);
        let update = update_ratings(&a, &b, 4, 4, KFactor::STANDARD).unwrap();
        assert_eq!(update.delta_a, 0.0);
        assert!(update.changes.iter().all(|c| c.before == c.after));
    }

    #[test]
    fn test_clamped_at_bounds() {
        let a = team(&[(1, 6.99)]);
        let b = team(&[(2, 1.01)]);
        // Upset at the edges of the scale
        let update = update_ratings(&b, &a, 6, 0, KFactor::TOURNAMENT).unwrap();
        for change in &update.changes {
            assert!((MIN_RATING..=MAX_RATING).contains(&change.after));
        }
    }

    #[test]
    fn test_empty_team_rejected() {
        let a = team(&[(1, 3.0)]);
        assert_eq!(
            update_ratings(&a, &[], 1, 0, KFactor::STANDARD),
            Err(RatingError::EmptyTeam('B'))
        );
    }

    #[test]
    fn test_nan_rejected() {
        let a = team(&[(1, f64::NAN)]);
        let b = team(&[(2, 3.0)]);
        assert!(matches!(
            update_ratings(&a, &b, 1, 0, KFactor::STANDARD),
            Err(RatingError::NotFinite(_))
        ));
    }
}
