//! HTTP routes
//!
//! Session authentication is an external collaborator; the `X-User-Id`
//! header stands in for its output and is required on every resume
//! endpoint.

pub mod resumes;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;
use crate::ingest::IngestError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid X-User-Id header")]
    Unauthorized,

    #[error("resume not found")]
    NotFound,

    /// Upstream (id generator / storage presign) unavailable; the client
    /// should retry later with the same input.
    #[error("upload preparation failed")]
    UploadPreparation,

    #[error("internal error")]
    Internal,
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UploadPreparation(_) => ApiError::UploadPreparation,
            IngestError::Registration(DbError::DocumentNotFound(_)) => ApiError::NotFound,
            IngestError::Registration(_) => ApiError::Internal,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::UploadPreparation => {
                (StatusCode::BAD_GATEWAY, "UPLOAD_PREPARATION_FAILED")
            }
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });
        (status, body).into_response()
    }
}

/// Owner identity from the session collaborator's header.
pub(crate) fn owner_id(headers: &HeaderMap) -> Result<i64, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or(ApiError::Unauthorized)
}
