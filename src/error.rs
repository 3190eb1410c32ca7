use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::models::ChallengeView;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Wrong answer to the verification question")]
    ChallengeFailed(ChallengeView),
    #[error("File is too large ({size} bytes, maximum is {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },
    /// Body cut off while streaming; the real size is never known
    #[error("Upload exceeds the maximum size of {max} bytes")]
    UploadTooLarge { max: u64 },
    #[error("File type not allowed: '{0}'")]
    FileTypeNotAllowed(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("File '{0}' not found")]
    FileNotFound(String),
    #[error("Object '{0}' not found")]
    ObjectNotFound(String),
    #[error("Storage key '{0}' is already in use")]
    StorageKeyTaken(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    challenge: Option<ChallengeView>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ChallengeFailed(_) => (StatusCode::BAD_REQUEST, "ChallengeFailed"),
            AppError::FileTooLarge { .. } | AppError::UploadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "FileTooLarge")
            }
            AppError::FileTypeNotAllowed(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "FileTypeNotAllowed")
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            AppError::FileNotFound(_) => (StatusCode::NOT_FOUND, "NoSuchFile"),
            AppError::ObjectNotFound(_) => (StatusCode::NOT_FOUND, "NoSuchKey"),
            AppError::StorageKeyTaken(_) => (StatusCode::CONFLICT, "StorageKeyTaken"),
            AppError::StorageError(_) | AppError::IoError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let message = self.to_string();
        let challenge = match self {
            AppError::ChallengeFailed(next) => Some(next),
            _ => None,
        };

        let body = ErrorResponse {
            error: code.to_string(),
            code: code.to_string(),
            message,
            challenge,
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::StorageError(format!("Corrupt metadata: {}", e))
    }
}
