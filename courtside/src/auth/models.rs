//! Caller identity.

use serde::{Deserialize, Serialize};

use crate::tournament::models::UserId;

/// The authenticated caller, as trusted by the tournament core
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    /// Current skill rating on the 1.0–7.0 scale
    pub rating: f64,
    pub is_admin: bool,
}

impl Principal {
    pub fn player(user_id: UserId, rating: f64) -> Self {
        Self {
            user_id,
            rating,
            is_admin: false,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            rating: crate::rating::MIN_RATING,
            is_admin: true,
        }
    }
}

/// JWT claims for access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId,
    pub rating: f64,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl From<AccessTokenClaims> for Principal {
    fn from(claims: AccessTokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            rating: claims.rating,
            is_admin: claims.is_admin,
        }
    }
}
