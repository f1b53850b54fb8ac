//! Tournament API handlers: lifecycle, registration, brackets and scheduling.
//!
//! Reads are public. Registration needs a bearer token; everything that
//! changes a tournament's lifecycle needs an admin token.
//!
//! # Examples
//!
//! Register with a partner:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/registrations \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"category_id": 2, "partner": 17}'
//! ```
//!
//! Close registration with three courts:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/close \
//!   -H "Authorization: Bearer ADMIN_TOKEN" \
//!   -d '{"courts_available": 3}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use courtside::{
    auth::Principal,
    db::CancellationReport,
    eligibility::EligibilityReport,
    tournament::{
        BulkRegistrationReport, CategoryId, Match, Participant, ParticipantId,
        RegistrationRequest, ScheduleOutcome, ScheduleRequest, Tournament, TournamentConfig,
        TournamentId, TournamentInfo, TournamentStatus, UserId,
    },
};
use serde::Deserialize;

use super::AppState;
use super::error::{ApiError, ApiResult, api_error};
use super::request_id::RequestId;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<TournamentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct PartnerQuery {
    pub partner: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub category_id: CategoryId,
    /// Second member for doubles
    pub partner: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct ClosePayload {
    /// Courts that round-robin rounds are sized for
    pub courts_available: usize,
}

/// List tournaments, optionally filtered by `?status=REGISTRATION_OPEN`
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Tournament>> {
    state
        .manager
        .list_tournaments(query.status)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Tournament with its categories and match progress
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<TournamentInfo> {
    state
        .manager
        .get_tournament_info(tournament_id)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn list_participants(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Vec<Participant>> {
    state
        .manager
        .list_participants(tournament_id)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn list_matches(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Vec<Match>> {
    state
        .manager
        .list_matches(tournament_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Matches of one category in display order
pub async fn get_bracket(
    State(state): State<AppState>,
    Path((tournament_id, category_id)): Path<(TournamentId, CategoryId)>,
) -> ApiResult<Vec<Match>> {
    state
        .manager
        .bracket(tournament_id, category_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Create a tournament in DRAFT (admin)
///
/// # Errors
///
/// - `400 Bad Request`: empty name, inverted window or an invalid category
pub async fn create_tournament(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    request_id: RequestId,
    Json(config): Json<TournamentConfig>,
) -> Result<(StatusCode, Json<Tournament>), ApiError> {
    let tournament = state
        .manager
        .create_tournament(config)
        .await
        .map_err(api_error)?;
    tracing::info!(
        request_id = request_id.as_str(),
        admin = principal.user_id,
        tournament_id = tournament.id,
        "tournament created"
    );
    Ok((StatusCode::CREATED, Json(tournament)))
}

pub async fn open_registration(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    state
        .manager
        .open_registration(tournament_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Close registration and generate brackets (admin)
pub async fn close_registration(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(payload): Json<ClosePayload>,
) -> ApiResult<Vec<Match>> {
    state
        .manager
        .close_registration(tournament_id, payload.courts_available)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Assign courts and slots, optionally holding them (admin). Once blocks
/// are held, a repeat run places newly playable matches inside them.
///
/// # Errors
///
/// - `409 Conflict`: the tournament is not closed or in progress
/// - `422 Unprocessable Entity`: no slots or no free courts
pub async fn schedule(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<ScheduleRequest>,
) -> ApiResult<ScheduleOutcome> {
    let outcome = state
        .manager
        .schedule(tournament_id, request)
        .await
        .map_err(api_error)?;
    metrics::court_blocks(
        outcome.reservations.created.len(),
        outcome.reservations.failed.len(),
    );
    Ok(Json(outcome))
}

pub async fn start_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    state
        .manager
        .start_tournament(tournament_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Cancel a tournament and release its court blocks (admin)
pub async fn cancel_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<CancellationReport> {
    state
        .manager
        .cancel_tournament(tournament_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Categories the caller (and `?partner=`) may enter
pub async fn check_eligibility(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(tournament_id): Path<TournamentId>,
    Query(query): Query<PartnerQuery>,
) -> ApiResult<EligibilityReport> {
    state
        .manager
        .check_eligibility(tournament_id, &principal, query.partner)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Register the caller into a category
///
/// # Errors
///
/// - `409 Conflict`: category full, registration not open, or already registered
/// - `422 Unprocessable Entity`: rating outside the band; the body lists why
pub async fn register(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(tournament_id): Path<TournamentId>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let result = state
        .manager
        .register(tournament_id, payload.category_id, &principal, payload.partner)
        .await;
    metrics::registrations_total(result.is_ok());
    let participant = result.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// Register many entries at once (admin); each entry succeeds or fails alone
pub async fn register_bulk(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(requests): Json<Vec<RegistrationRequest>>,
) -> ApiResult<BulkRegistrationReport> {
    let report = state
        .manager
        .register_bulk(tournament_id, requests)
        .await
        .map_err(api_error)?;
    for _ in &report.registered {
        metrics::registrations_total(true);
    }
    for _ in &report.failed {
        metrics::registrations_total(false);
    }
    Ok(Json(report))
}

/// Withdraw a participant; members and admins only
pub async fn unregister(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(participant_id): Path<ParticipantId>,
) -> Result<StatusCode, ApiError> {
    state
        .manager
        .unregister(participant_id, &principal)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}
