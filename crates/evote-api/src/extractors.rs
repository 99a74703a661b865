//! # Request Extraction
//!
//! Handlers take `Result<Json<T>, JsonRejection>` (or the `Query`
//! equivalent) and map rejections here, so that a malformed body reports the
//! same 400 message as a body with missing fields.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;

use crate::error::AppError;

/// Extract a JSON body, mapping any rejection to
/// [`AppError::InvalidInput`] with `missing` as the message.
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body, MISSING_DATA)?;
/// }
/// ```
pub fn extract_json<T>(
    result: Result<Json<T>, JsonRejection>,
    missing: &'static str,
) -> Result<T, AppError> {
    result.map(|Json(v)| v).map_err(|err| {
        tracing::debug!(rejection = %err.body_text(), "request body rejected");
        AppError::InvalidInput(missing)
    })
}

/// Extract query parameters, mapping any rejection to
/// [`AppError::InvalidInput`] with `missing` as the message.
pub fn extract_query<T>(
    result: Result<Query<T>, QueryRejection>,
    missing: &'static str,
) -> Result<T, AppError> {
    result.map(|Query(v)| v).map_err(|err| {
        tracing::debug!(rejection = %err.body_text(), "query string rejected");
        AppError::InvalidInput(missing)
    })
}
