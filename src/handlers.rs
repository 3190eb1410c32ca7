use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::service::UploadFile;

use crate::AppState;

/// Room for multipart framing and the text fields on top of the file itself
const MULTIPART_SLACK: usize = 2 * 1024 * 1024;

// ─── REST API Routes ─────────────────────────────────────────────

pub fn api_routes(max_upload_size: u64) -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/challenge", get(new_challenge))
        .route(
            "/upload",
            post(upload_file)
                .layer(DefaultBodyLimit::max(max_upload_size as usize + MULTIPART_SLACK)),
        )
        // File list and per-file actions
        .route("/files", get(list_files))
        .route("/files/:id", get(get_file))
        .route("/files/:id/download", post(download_file))
        .route("/files/:id/link", get(share_link))
        .route("/files/:id/preview", get(preview_link))
        // HTML gallery
        .route("/pages", get(list_pages))
}

/// Public object URLs. Wildcards must be registered at top level.
pub fn storage_routes() -> Router<Arc<AppState>> {
    Router::new().route("/storage/*path", get(get_object))
}

// ─── Stats / Challenge ───────────────────────────────────────────

async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.host.get_stats())
}

async fn new_challenge(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.challenges.issue())
}

// ─── Upload ──────────────────────────────────────────────────────

fn multipart_error(e: axum::extract::multipart::MultipartError, max: u64) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::UploadTooLarge { max }
    } else {
        AppError::BadRequest(format!("Multipart error: {}", e))
    }
}

/// Multipart fields: `token` and `answer` for the challenge, `file` for the upload.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let max = state.host.max_upload_size();
    let mut token = String::new();
    let mut answer = String::new();
    let mut file: Option<UploadFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "token" => token = field.text().await.map_err(|e| multipart_error(e, max))?,
            "answer" => answer = field.text().await.map_err(|e| multipart_error(e, max))?,
            "file" => {
                let name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "upload".to_string());
                let mime_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                let data: Bytes = field.bytes().await.map_err(|e| multipart_error(e, max))?;
                file = Some(UploadFile {
                    name,
                    mime_type,
                    data,
                });
            }
            _ => {}
        }
    }

    let solved = state
        .challenges
        .verify(&token, &answer)
        .map_err(AppError::ChallengeFailed)?;

    let uploaded = match file {
        Some(file) => state.host.upload(file),
        None => Err(AppError::BadRequest("No file selected".to_string())),
    };
    let record = match uploaded {
        Ok(record) => record,
        Err(e) => {
            // the answer stays good for another file
            state.challenges.restore(solved);
            return Err(e);
        }
    };
    let challenge = state.challenges.issue();

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file: record,
            challenge,
        }),
    ))
}

// ─── File Handlers ───────────────────────────────────────────────

async fn list_files(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let files = state.host.list();
    Json(ListFilesResponse {
        count: files.len(),
        files,
    })
}

async fn list_pages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let files = state.host.list_html();
    Json(ListFilesResponse {
        count: files.len(),
        files,
    })
}

async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.host.get(&id)?))
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(state.host.record_download(&id)?))
}

async fn share_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let url = state.host.share_link(&id)?;
    Ok(Json(LinkResponse { url }))
}

async fn preview_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let url = state.host.viewer_url(&id)?;
    Ok(Json(LinkResponse { url }))
}

// ─── Public Objects ──────────────────────────────────────────────

async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> AppResult<Response> {
    let key = path.strip_prefix('/').unwrap_or(&path);
    let (meta, data) = state.host.open_object(key)?;

    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(&meta.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert("content-type", content_type);
    if let Ok(etag) = HeaderValue::from_str(&meta.etag) {
        headers.insert("etag", etag);
    }
    if let Ok(modified) = HeaderValue::from_str(&meta.last_modified.to_rfc2822()) {
        headers.insert("last-modified", modified);
    }
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));

    Ok((StatusCode::OK, headers, data).into_response())
}
