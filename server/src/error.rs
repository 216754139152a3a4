//! Error types for the broadsheet API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use broadsheet::{DatabaseError, IngestError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            ApiError::Ingest(error) => ingest_response(error),
            ApiError::Database(error) => {
                tracing::error!(%error, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    Some(error.to_string()),
                )
            }
        };

        // Responses carry a readable message and, where one exists, the
        // underlying error string. Never a backtrace.
        let body = match detail {
            Some(error) => Json(json!({
                "success": false,
                "message": message,
                "error": error,
            })),
            None => Json(json!({
                "success": false,
                "message": message,
            })),
        };

        (status, body).into_response()
    }
}

/// Maps a pipeline failure onto a status, message and detail string.
///
/// Upload and validation problems are the caller's fault (400); anything
/// past validation failed server-side (500).
fn ingest_response(error: &IngestError) -> (StatusCode, String, Option<String>) {
    match error {
        IngestError::InvalidUpload(reason) => (StatusCode::BAD_REQUEST, reason.clone(), None),
        IngestError::Validation(source) => (
            StatusCode::BAD_REQUEST,
            "The uploaded file is not a usable PDF".to_string(),
            Some(source.to_string()),
        ),
        IngestError::Workspace(_)
        | IngestError::Conversion(_)
        | IngestError::Storage(_)
        | IngestError::Record(_) => {
            tracing::error!(%error, "newspaper upload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not process the uploaded newspaper".to_string(),
                Some(error.to_string()),
            )
        }
    }
}
