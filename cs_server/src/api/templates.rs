//! Recurring template API handlers (admin).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use courtside::recurrence::{
    GenerationReport, NewTemplate, RecurringTournamentTemplate, TemplateId,
};
use serde::Deserialize;

use super::AppState;
use super::error::{ApiError, ApiResult, api_error};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct ActivePayload {
    pub active: bool,
}

pub async fn create_template(
    State(state): State<AppState>,
    Json(new): Json<NewTemplate>,
) -> Result<(StatusCode, Json<RecurringTournamentTemplate>), ApiError> {
    let template = state
        .manager
        .create_template(new)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> ApiResult<Vec<RecurringTournamentTemplate>> {
    state
        .manager
        .list_templates(query.active_only)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn set_active(
    State(state): State<AppState>,
    Path(template_id): Path<TemplateId>,
    Json(payload): Json<ActivePayload>,
) -> Result<StatusCode, ApiError> {
    state
        .manager
        .set_template_active(template_id, payload.active)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stamp this template's due instances now instead of waiting for the
/// periodic run
pub async fn generate(
    State(state): State<AppState>,
    Path(template_id): Path<TemplateId>,
) -> ApiResult<GenerationReport> {
    let report = state
        .manager
        .generate_recurring_instances(template_id, Utc::now())
        .await
        .map_err(api_error)?;
    metrics::recurring_instances_total(report.created.len());
    Ok(Json(report))
}
