//! Tunables of the tournament core.

use crate::rating::{KFactor, MAX_RATING, MIN_RATING};
use crate::recurrence::MAX_ADVANCE_DAYS;

use super::errors::{TournamentError, TournamentResult};

/// Core configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// K-factor for tournament match results
    pub tournament_k: KFactor,
    /// Rating assumed for a user with no stored rating
    pub default_rating: f64,
    /// Advance window for templates created without one
    pub default_advance_days: u32,
    /// Slot length when a schedule request gives no explicit slots
    pub slot_minutes: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            tournament_k: KFactor::TOURNAMENT,
            default_rating: MIN_RATING,
            default_advance_days: 14,
            slot_minutes: 60,
        }
    }
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl CoreConfig {
    /// Load from environment variables, falling back to defaults
    ///
    /// - `TOURNAMENT_K_FACTOR` (default: 40)
    /// - `DEFAULT_PLAYER_RATING` (default: 1.0)
    /// - `DEFAULT_ADVANCE_DAYS` (default: 14)
    /// - `SLOT_MINUTES` (default: 60)
    pub fn from_env() -> TournamentResult<Self> {
        let defaults = Self::default();
        let config = Self {
            tournament_k: KFactor(parse_env_or("TOURNAMENT_K_FACTOR", defaults.tournament_k.0)),
            default_rating: parse_env_or("DEFAULT_PLAYER_RATING", defaults.default_rating),
            default_advance_days: parse_env_or(
                "DEFAULT_ADVANCE_DAYS",
                defaults.default_advance_days,
            ),
            slot_minutes: parse_env_or("SLOT_MINUTES", defaults.slot_minutes),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TournamentResult<()> {
        // Tournament results must weigh more than casual play
        if !self.tournament_k.0.is_finite() || self.tournament_k.0 <= KFactor::STANDARD.0 {
            return Err(TournamentError::InvalidConfig(format!(
                "TOURNAMENT_K_FACTOR must be a number above {}",
                KFactor::STANDARD.0
            )));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.default_rating) {
            return Err(TournamentError::InvalidConfig(format!(
                "DEFAULT_PLAYER_RATING must be within {MIN_RATING}..={MAX_RATING}"
            )));
        }
        if !(1..=MAX_ADVANCE_DAYS).contains(&self.default_advance_days) {
            return Err(TournamentError::InvalidConfig(format!(
                "DEFAULT_ADVANCE_DAYS must be within 1..={MAX_ADVANCE_DAYS}"
            )));
        }
        // Slots have to start on the hour
        if self.slot_minutes <= 0 || self.slot_minutes % 60 != 0 {
            return Err(TournamentError::InvalidConfig(
                "SLOT_MINUTES must be a positive multiple of 60".to_string(),
            ));
        }
        Ok(())
    }
}
