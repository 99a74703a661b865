//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the voting API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "eVote API",
        version = "0.1.0",
        description = "One-time code issuance, code and biometric verification, and exactly-once vote casting.",
        license(name = "BUSL-1.1")
    ),
    paths(
        crate::routes::voting::send_otp,
        crate::routes::voting::verify_otp,
        crate::routes::voting::verify_iris,
        crate::routes::voting::vote,
        crate::routes::status::voter_status,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::routes::voting::SendOtpRequest,
        crate::routes::voting::VerifyOtpRequest,
        crate::routes::voting::VerifyIrisRequest,
        crate::routes::voting::VoteRequest,
        crate::routes::voting::MessageResponse,
        crate::routes::status::StatusResponse,
    )),
    tags(
        (name = "voting", description = "Voter verification and vote casting"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_spec_has_title() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "eVote API");
    }

    #[test]
    fn openapi_spec_lists_every_voting_step() {
        let spec = ApiDoc::openapi();
        for path in [
            "/api/send-otp",
            "/api/verify-otp",
            "/api/verify-iris",
            "/api/vote",
            "/api/status",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn openapi_spec_serializes() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("ErrorBody"));
        assert!(json.contains("irisHash"));
    }
}
