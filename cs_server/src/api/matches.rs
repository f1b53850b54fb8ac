//! Match API handlers (admin).
//!
//! Every handler returns the [`MatchOutcome`]: the matches the transition
//! touched, rating changes and whether the tournament just finished.

use axum::{
    Json,
    extract::{Path, State},
};
use courtside::{
    advancement::MatchResult,
    tournament::{MatchId, MatchOutcome, ParticipantId},
};
use serde::Deserialize;

use super::AppState;
use super::error::{ApiResult, api_error};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct WalkoverPayload {
    pub winner: ParticipantId,
}

fn record(kind: &'static str, outcome: MatchOutcome) -> ApiResult<MatchOutcome> {
    metrics::match_transitions_total(kind);
    if outcome.tournament_completed {
        metrics::tournaments_completed_total();
    }
    Ok(Json(outcome))
}

pub async fn start_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<MatchOutcome> {
    let outcome = state
        .manager
        .start_match(match_id)
        .await
        .map_err(api_error)?;
    record("start", outcome)
}

/// Report a played result
///
/// ```json
/// { "team1_score": 6, "team2_score": 4 }
/// ```
pub async fn complete_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(result): Json<MatchResult>,
) -> ApiResult<MatchOutcome> {
    let outcome = state
        .manager
        .complete_match(match_id, result)
        .await
        .map_err(api_error)?;
    record("result", outcome)
}

pub async fn record_walkover(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(payload): Json<WalkoverPayload>,
) -> ApiResult<MatchOutcome> {
    let outcome = state
        .manager
        .record_walkover(match_id, payload.winner)
        .await
        .map_err(api_error)?;
    record("walkover", outcome)
}

pub async fn cancel_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<MatchOutcome> {
    let outcome = state
        .manager
        .cancel_match(match_id)
        .await
        .map_err(api_error)?;
    record("cancel", outcome)
}
