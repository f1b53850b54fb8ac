//! Mapping of core errors onto HTTP responses.

use axum::{Json, http::StatusCode};
use courtside::{
    advancement::AdvancementError, auth::AuthError, eligibility::CategoryExclusion,
    tournament::TournamentError,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Categories the caller was turned away from, for rating rejections
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<CategoryExclusion>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            exclusions: Vec::new(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Handler result: JSON body or a status with an error body
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Status code for a core error
pub fn status_for(err: &TournamentError) -> StatusCode {
    match err {
        TournamentError::NotFound(_) => StatusCode::NOT_FOUND,
        TournamentError::Advancement(AdvancementError::NotFound(_)) => StatusCode::NOT_FOUND,
        TournamentError::InvalidState { .. }
        | TournamentError::CapacityExceeded { .. }
        | TournamentError::ConflictingReservation { .. }
        | TournamentError::AlreadyRegistered(_)
        | TournamentError::ConcurrentUpdate(_)
        | TournamentError::Advancement(_) => StatusCode::CONFLICT,
        TournamentError::IneligibleRating { .. } | TournamentError::SchedulingInfeasible(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        TournamentError::Forbidden(_) => StatusCode::FORBIDDEN,
        TournamentError::InvalidConfig(_)
        | TournamentError::Rating(_)
        | TournamentError::Eligibility(_)
        | TournamentError::Bracket(_)
        | TournamentError::Schedule(_)
        | TournamentError::Recurrence(_) => StatusCode::BAD_REQUEST,
        TournamentError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        TournamentError::Database(_)
        | TournamentError::Serialization(_)
        | TournamentError::CorruptRow(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a core error into a response, logging server-side failures
pub fn api_error(err: TournamentError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }

    let mut body = ErrorResponse::new(err.client_message());
    if let TournamentError::IneligibleRating { exclusions, .. } = err {
        body.exclusions = exclusions;
    }
    (status, Json(body))
}

pub fn auth_error(err: &AuthError) -> ApiError {
    let status = match err {
        AuthError::AdminRequired => StatusCode::FORBIDDEN,
        AuthError::JwtError(_) | AuthError::MissingToken => StatusCode::UNAUTHORIZED,
    };
    (status, Json(ErrorResponse::new(err.client_message())))
}
