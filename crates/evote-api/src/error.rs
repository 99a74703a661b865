//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`ServiceError`]s to HTTP status codes and the client-facing error
//! strings voters' front ends already match on. Store details are logged,
//! never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use evote_state::VerificationStage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::service::ServiceError;

/// Message for a request-code call missing either identity field.
pub const IDENTITY_REQUIRED: &str = "Voter ID and phone required";

/// Message for any other call missing a required field.
pub const MISSING_DATA: &str = "Missing data";

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code (e.g. "ALREADY_VOTED").
    pub code: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Required field missing or body unparseable (400).
    #[error("{0}")]
    InvalidInput(&'static str),

    /// No record for the identity key (404).
    #[error("Voter not found")]
    NotFound,

    /// Submitted code rejected (400).
    #[error("Invalid OTP")]
    InvalidCode,

    /// Biometric step attempted before code verification (400).
    #[error("OTP not verified")]
    CodeNotVerified,

    /// Vote attempted before both factors were verified (400).
    #[error("Authentication incomplete")]
    AuthenticationIncomplete,

    /// Biometric sample not in the reference set (400).
    #[error("Iris verification failed")]
    BiometricMismatch,

    /// Vote latch already set (400).
    #[error("Already voted")]
    AlreadyVoted,

    /// Store unreachable or timed out (503). Message is logged but not returned.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            Self::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::InvalidCode => (StatusCode::BAD_REQUEST, "INVALID_CODE"),
            Self::CodeNotVerified | Self::AuthenticationIncomplete => {
                (StatusCode::BAD_REQUEST, "PRECONDITION_FAILED")
            }
            Self::BiometricMismatch => (StatusCode::BAD_REQUEST, "BIOMETRIC_MISMATCH"),
            Self::AlreadyVoted => (StatusCode::BAD_REQUEST, "ALREADY_VOTED"),
            Self::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
        }
    }

    /// Map a service error, reporting missing input with `missing`.
    pub fn from_service(err: ServiceError, missing: &'static str) -> Self {
        match err {
            ServiceError::InvalidInput(_) => Self::InvalidInput(missing),
            ServiceError::NotFound => Self::NotFound,
            ServiceError::InvalidCode(_) => Self::InvalidCode,
            ServiceError::PreconditionFailed { required, .. } => {
                if required == VerificationStage::CodeVerified {
                    Self::CodeNotVerified
                } else {
                    Self::AuthenticationIncomplete
                }
            }
            ServiceError::BiometricMismatch => Self::BiometricMismatch,
            ServiceError::AlreadyVoted => Self::AlreadyVoted,
            ServiceError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        Self::from_service(err, MISSING_DATA)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose store error messages to clients.
        let message = match &self {
            Self::Unavailable(_) => {
                tracing::warn!(error = %self, "service unavailable");
                "Service temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evote_core::ValidationError;
    use evote_state::CodeRejection;

    #[test]
    fn invalid_input_status_code() {
        let (status, code) = AppError::InvalidInput(MISSING_DATA).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "INVALID_INPUT");
    }

    #[test]
    fn not_found_status_code() {
        let (status, code) = AppError::NotFound.status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
    }

    #[test]
    fn unavailable_status_code() {
        let (status, code) = AppError::Unavailable("pool timed out".into()).status_and_code();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "UNAVAILABLE");
    }

    #[test]
    fn domain_errors_are_bad_request() {
        for err in [
            AppError::InvalidCode,
            AppError::CodeNotVerified,
            AppError::AuthenticationIncomplete,
            AppError::BiometricMismatch,
            AppError::AlreadyVoted,
        ] {
            assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST, "{err}");
        }
    }

    #[test]
    fn precondition_maps_by_required_stage() {
        let code_first = ServiceError::PreconditionFailed {
            stage: VerificationStage::CodeSent,
            required: VerificationStage::CodeVerified,
        };
        assert!(matches!(AppError::from(code_first), AppError::CodeNotVerified));

        let both_factors = ServiceError::PreconditionFailed {
            stage: VerificationStage::CodeVerified,
            required: VerificationStage::BiometricVerified,
        };
        assert!(matches!(
            AppError::from(both_factors),
            AppError::AuthenticationIncomplete
        ));
    }

    #[test]
    fn invalid_input_uses_caller_message() {
        let err = ServiceError::InvalidInput(ValidationError::EmptyField("phone"));
        let app = AppError::from_service(err.clone(), IDENTITY_REQUIRED);
        assert_eq!(app.to_string(), "Voter ID and phone required");
        assert_eq!(AppError::from(err).to_string(), "Missing data");
    }

    #[test]
    fn invalid_code_reason_is_not_exposed() {
        let app = AppError::from(ServiceError::InvalidCode(CodeRejection::Expired));
        assert_eq!(app.to_string(), "Invalid OTP");
    }

    // ── into_response tests ──────────────────────────────────────

    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn into_response_already_voted() {
        let (status, body) = response_parts(AppError::AlreadyVoted).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Already voted");
        assert_eq!(body.code, "ALREADY_VOTED");
    }

    #[tokio::test]
    async fn into_response_not_found() {
        let (status, body) = response_parts(AppError::NotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Voter not found");
    }

    #[tokio::test]
    async fn into_response_unavailable_hides_details() {
        let (status, body) =
            response_parts(AppError::Unavailable("connection refused to db:5432".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error, "Service temporarily unavailable");
        assert!(!body.error.contains("5432"));
    }
}
