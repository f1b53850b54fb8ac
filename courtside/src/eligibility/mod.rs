//! Category eligibility from rating bands.
//!
//! A category accepts a participant when the participant's rating falls in
//! the category band and the category still has room. The evaluator never
//! writes anything; the capacity-checked insert happens in the store.

pub mod evaluator;

pub use evaluator::{
    CategoryExclusion, EligibilityError, EligibilityReport, EligibilityResult, ExclusionReason,
    RatingBand, SkillTier, evaluate, is_eligible, team_rating,
};
