//! Resume endpoints
//!
//! - POST /api/v1/resumes/upload-url - issue an upload slot
//! - POST /api/v1/resumes            - register a completed upload
//! - GET  /api/v1/resumes/{id}       - fetch metadata and parse outcome

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{owner_id, ApiError};
use crate::document::Document;
use crate::ingest::{RegisterDocument, UploadLocation};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload-url", post(request_upload_url))
        .route("/", post(register))
        .route("/:id", get(get_resume))
}

#[derive(Deserialize)]
struct UploadUrlRequest {
    filename: String,
    #[allow(dead_code)]
    filetype: String,
}

#[derive(Serialize)]
struct ResumeInfo {
    id: i64,
    user_id: i64,
    file_key: String,
    filename: String,
    filetype: String,
    filesize: i64,
    /// Packed legacy status code, see `Document::wire_status`.
    status: i32,
    llm_parse_content: String,
    parse_error: String,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_url: Option<String>,
}

impl ResumeInfo {
    fn from_document(document: Document, download_url: Option<String>) -> Self {
        Self {
            id: document.id,
            user_id: document.user_id,
            status: document.wire_status(),
            file_key: document.file_key,
            filename: document.filename,
            filetype: document.filetype,
            filesize: document.filesize,
            llm_parse_content: document.llm_parse_content,
            parse_error: document.parse_error,
            updated_at: document.updated_at,
            download_url,
        }
    }
}

async fn request_upload_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UploadUrlRequest>,
) -> Result<Json<UploadLocation>, ApiError> {
    let user_id = owner_id(&headers)?;
    let location = state
        .ingest()
        .request_upload_location(user_id, &request.filename)
        .await?;
    Ok(Json(location))
}

async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegisterDocument>,
) -> Result<Json<ResumeInfo>, ApiError> {
    let user_id = owner_id(&headers)?;
    let document = state.ingest().register_document(user_id, request).await?;
    Ok(Json(ResumeInfo::from_document(document, None)))
}

async fn get_resume(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ResumeInfo>, ApiError> {
    let user_id = owner_id(&headers)?;
    let (document, download_url) = state.ingest().get_document(user_id, id).await?;
    Ok(Json(ResumeInfo::from_document(document, download_url)))
}
