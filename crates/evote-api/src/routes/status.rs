//! # Voter Status API
//!
//! Read-only view of where a voter is in the flow. Never returns the
//! pending code, the biometric token, or the recorded choice.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, MISSING_DATA};
use crate::extractors::extract_query;
use crate::state::AppState;

/// Identity of the voter to look up.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(default, rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Voter identifier.
    pub voter_id: String,
    /// Registered phone number.
    pub phone: String,
}

/// Progress of a single voter.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// One of `UNVERIFIED`, `CODE_SENT`, `CODE_VERIFIED`,
    /// `BIOMETRIC_VERIFIED`, `VOTED`.
    pub stage: String,
    pub has_voted: bool,
}

/// Build the status router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/status", get(voter_status))
}

/// GET /api/status — Current stage of a voter.
#[utoipa::path(
    get,
    path = "/api/status",
    params(StatusQuery),
    responses(
        (status = 200, description = "Voter found", body = StatusResponse),
        (status = 400, description = "Missing data", body = crate::error::ErrorBody),
        (status = 404, description = "Voter not found", body = crate::error::ErrorBody),
        (status = 503, description = "Store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "voting"
)]
pub async fn voter_status(
    State(state): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let q = extract_query(query, MISSING_DATA)?;
    let status = state.service.status(&q.voter_id, &q.phone).await?;
    Ok(Json(StatusResponse {
        stage: status.stage.as_str().to_string(),
        has_voted: status.has_voted,
    }))
}
