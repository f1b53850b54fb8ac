//! Band matching and per-category exclusion reasons.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rating::{MAX_RATING, MIN_RATING};
use crate::tournament::models::{Category, CategoryId, TeamSize};

/// Eligibility errors
#[derive(Debug, Error, PartialEq)]
pub enum EligibilityError {
    #[error("a team needs exactly {expected} players, got {actual}")]
    TeamSize { expected: usize, actual: usize },

    #[error("rating {0} is not a finite number")]
    InvalidRating(f64),
}

pub type EligibilityResult<T> = Result<T, EligibilityError>;

/// Rating range `[min, max)` of a category.
///
/// An open-ended band (the top tier) accepts every rating at or above `min`
/// and ignores `max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingBand {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub open_ended: bool,
}

impl RatingBand {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            open_ended: false,
        }
    }

    /// Top band: everything from `min` upwards
    pub fn open_top(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            open_ended: true,
        }
    }

    /// Accepts every rating on the scale
    pub fn open() -> Self {
        Self::open_top(MIN_RATING, MAX_RATING)
    }

    pub fn contains(&self, rating: f64) -> bool {
        is_eligible(rating, self)
    }
}

/// Default club skill tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl SkillTier {
    pub const ALL: [SkillTier; 4] = [
        SkillTier::Bronze,
        SkillTier::Silver,
        SkillTier::Gold,
        SkillTier::Platinum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
        }
    }

    pub fn band(&self) -> RatingBand {
        match self {
            Self::Bronze => RatingBand::new(1.0, 3.0),
            Self::Silver => RatingBand::new(3.0, 4.0),
            Self::Gold => RatingBand::new(4.0, 5.0),
            Self::Platinum => RatingBand::open_top(5.0, MAX_RATING),
        }
    }

    /// Tier whose band holds `rating`
    pub fn for_rating(rating: f64) -> Option<SkillTier> {
        Self::ALL.into_iter().find(|tier| tier.band().contains(rating))
    }
}

/// Why a category was not offered
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExclusionReason {
    BelowMinimum { min: f64 },
    AboveMaximum { max: f64 },
    CapacityFull { capacity: usize },
}

/// A category that was tried and rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryExclusion {
    pub category_id: CategoryId,
    pub category_name: String,
    pub reason: ExclusionReason,
}

/// Outcome of evaluating one rating against a tournament's categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub rating: f64,
    pub eligible: Vec<CategoryId>,
    pub excluded: Vec<CategoryExclusion>,
}

impl EligibilityReport {
    pub fn is_eligible_for(&self, category_id: CategoryId) -> bool {
        self.eligible.contains(&category_id)
    }

    pub fn exclusion_for(&self, category_id: CategoryId) -> Option<&CategoryExclusion> {
        self.excluded.iter().find(|e| e.category_id == category_id)
    }
}

/// Band membership test.
pub fn is_eligible(rating: f64, band: &RatingBand) -> bool {
    if band.open_ended {
        rating >= band.min
    } else {
        band.min <= rating && rating < band.max
    }
}

/// Rating a participant registers with.
///
/// Individuals use their own rating, doubles teams the mean of exactly two
/// members.
pub fn team_rating(team_size: TeamSize, member_ratings: &[f64]) -> EligibilityResult<f64> {
    let expected = team_size.members();
    if member_ratings.len() != expected {
        return Err(EligibilityError::TeamSize {
            expected,
            actual: member_ratings.len(),
        });
    }
    if let Some(bad) = member_ratings.iter().find(|r| !r.is_finite()) {
        return Err(EligibilityError::InvalidRating(*bad));
    }
    Ok(member_ratings.iter().sum::<f64>() / expected as f64)
}

/// Sort every category into eligible or excluded with a reason.
///
/// Band mismatches are reported ahead of capacity so callers can tell a
/// player who is in the wrong tier from one who is simply too late.
pub fn evaluate(rating: f64, categories: &[Category]) -> EligibilityReport {
    let mut eligible = Vec::new();
    let mut excluded = Vec::new();

    for category in categories {
        let band = &category.band;
        let reason = if rating < band.min {
            Some(ExclusionReason::BelowMinimum { min: band.min })
        } else if !is_eligible(rating, band) {
            Some(ExclusionReason::AboveMaximum { max: band.max })
        } else if category.remaining_capacity() == 0 {
            Some(ExclusionReason::CapacityFull {
                capacity: category.capacity,
            })
        } else {
            None
        };

        match reason {
            None => eligible.push(category.id),
            Some(reason) => excluded.push(CategoryExclusion {
                category_id: category.id,
                category_name: category.name.clone(),
                reason,
            }),
        }
    }

    EligibilityReport {
        rating,
        eligible,
        excluded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: CategoryId, band: RatingBand, capacity: usize, registered: usize) -> Category {
        Category {
            id,
            tournament_id: 1,
            name: format!("Category {id}"),
            band,
            capacity,
            registered_count: registered,
        }
    }

    #[test]
    fn test_closed_band_is_half_open() {
        let band = RatingBand::new(1.0, 3.0);
        assert!(is_eligible(1.0, &band));
        assert!(is_eligible(2.99, &band));
        assert!(!is_eligible(3.0, &band));
        assert!(!is_eligible(0.99, &band));
    }

    #[test]
    fn test_open_top_band_ignores_max() {
        let band = RatingBand::open_top(5.0, 10.0);
        assert!(is_eligible(9.5, &band));
        assert!(is_eligible(12.0, &band));
        assert!(!is_eligible(4.9, &band));
    }

    #[test]
    fn test_team_rating_mean_of_two() {
        assert_eq!(team_rating(TeamSize::Doubles, &[2.0, 3.0]), Ok(2.5));
        assert_eq!(team_rating(TeamSize::Individual, &[4.2]), Ok(4.2));
    }

    #[test]
    fn test_team_rating_rejects_wrong_size() {
        assert_eq!(
            team_rating(TeamSize::Doubles, &[2.0, 3.0, 4.0]),
            Err(EligibilityError::TeamSize {
                expected: 2,
                actual: 3
            })
        );
        assert!(team_rating(TeamSize::Doubles, &[2.0]).is_err());
    }

    #[test]
    fn test_evaluate_reports_every_reason() {
        let categories = vec![
            category(1, RatingBand::new(1.0, 3.0), 4, 0),
            category(2, RatingBand::new(3.0, 4.0), 4, 4),
            category(3, RatingBand::new(4.0, 5.0), 4, 0),
            category(4, RatingBand::new(3.0, 4.5), 8, 2),
        ];

        let report = evaluate(3.5, &categories);
        assert_eq!(report.eligible, vec![4]);
        assert_eq!(
            report.exclusion_for(1).unwrap().reason,
            ExclusionReason::AboveMaximum { max: 3.0 }
        );
        assert_eq!(
            report.exclusion_for(2).unwrap().reason,
            ExclusionReason::CapacityFull { capacity: 4 }
        );
        assert_eq!(
            report.exclusion_for(3).unwrap().reason,
            ExclusionReason::BelowMinimum { min: 4.0 }
        );
    }

    #[test]
    fn test_band_mismatch_wins_over_capacity() {
        let categories = vec![category(1, RatingBand::new(1.0, 3.0), 2, 2)];
        let report = evaluate(3.5, &categories);
        assert_eq!(
            report.exclusion_for(1).unwrap().reason,
            ExclusionReason::AboveMaximum { max: 3.0 }
        );
    }

    #[test]
    fn test_skill_tiers_cover_scale() {
        assert_eq!(SkillTier::for_rating(1.0), Some(SkillTier::Bronze));
        assert_eq!(SkillTier::for_rating(3.0), Some(SkillTier::Silver));
        assert_eq!(SkillTier::for_rating(4.99), Some(SkillTier::Gold));
        assert_eq!(SkillTier::for_rating(7.0), Some(SkillTier::Platinum));
        assert_eq!(SkillTier::for_rating(0.5), None);
    }
}
