//! # Voting Flow API
//!
//! The four steps a voter walks through, in order: request a one-time
//! code, verify it, verify a biometric sample, cast the vote. Request and
//! response bodies keep the camelCase field names and the message strings
//! existing front ends depend on.
//!
//! Missing fields deserialize as empty strings so that a body without a
//! field and a body with an empty field are rejected the same way, by the
//! service.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, IDENTITY_REQUIRED, MISSING_DATA};
use crate::extractors::extract_json;
use crate::state::AppState;

/// Request a one-time code.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub voter_id: String,
    pub phone: String,
}

/// Submit the code received by SMS.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub voter_id: String,
    pub phone: String,
    pub otp: String,
}

/// Submit a biometric sample token.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyIrisRequest {
    pub voter_id: String,
    pub phone: String,
    pub iris_hash: String,
}

/// Cast a vote.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct VoteRequest {
    pub voter_id: String,
    pub phone: String,
    pub party: String,
}

/// Success body for every voting step.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Build the voting router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/send-otp", post(send_otp))
        .route("/api/verify-otp", post(verify_otp))
        .route("/api/verify-iris", post(verify_iris))
        .route("/api/vote", post(vote))
}

/// POST /api/send-otp — Issue a one-time code and send it to the phone.
///
/// Creates the voter record on first contact. A repeat request replaces
/// the pending code and resets code verification.
#[utoipa::path(
    post,
    path = "/api/send-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code issued", body = MessageResponse),
        (status = 400, description = "Voter ID or phone missing", body = crate::error::ErrorBody),
        (status = 503, description = "Store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "voting"
)]
pub async fn send_otp(
    State(state): State<AppState>,
    body: Result<Json<SendOtpRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let req = extract_json(body, IDENTITY_REQUIRED)?;
    state
        .service
        .request_code(&req.voter_id, &req.phone)
        .await
        .map_err(|e| AppError::from_service(e, IDENTITY_REQUIRED))?;
    Ok(MessageResponse::new("OTP sent"))
}

/// POST /api/verify-otp — Check the submitted code.
#[utoipa::path(
    post,
    path = "/api/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted", body = MessageResponse),
        (status = 400, description = "Missing data or invalid code", body = crate::error::ErrorBody),
        (status = 404, description = "Voter not found", body = crate::error::ErrorBody),
        (status = 503, description = "Store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "voting"
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    body: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let req = extract_json(body, MISSING_DATA)?;
    state
        .service
        .verify_code(&req.voter_id, &req.phone, &req.otp)
        .await?;
    Ok(MessageResponse::new("OTP verified"))
}

/// POST /api/verify-iris — Check a biometric sample against the
/// reference set. Requires a verified code.
#[utoipa::path(
    post,
    path = "/api/verify-iris",
    request_body = VerifyIrisRequest,
    responses(
        (status = 200, description = "Sample accepted", body = MessageResponse),
        (status = 400, description = "Missing data, code not verified, or sample rejected", body = crate::error::ErrorBody),
        (status = 404, description = "Voter not found", body = crate::error::ErrorBody),
        (status = 503, description = "Store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "voting"
)]
pub async fn verify_iris(
    State(state): State<AppState>,
    body: Result<Json<VerifyIrisRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let req = extract_json(body, MISSING_DATA)?;
    state
        .service
        .verify_biometric(&req.voter_id, &req.phone, &req.iris_hash)
        .await?;
    Ok(MessageResponse::new("Iris verified"))
}

/// POST /api/vote — Record the vote. Succeeds at most once per voter.
#[utoipa::path(
    post,
    path = "/api/vote",
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = MessageResponse),
        (status = 400, description = "Missing data, authentication incomplete, or already voted", body = crate::error::ErrorBody),
        (status = 404, description = "Voter not found", body = crate::error::ErrorBody),
        (status = 503, description = "Store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "voting"
)]
pub async fn vote(
    State(state): State<AppState>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let req = extract_json(body, MISSING_DATA)?;
    state
        .service
        .cast_vote(&req.voter_id, &req.phone, &req.party)
        .await?;
    Ok(MessageResponse::new("Vote successfully recorded"))
}
