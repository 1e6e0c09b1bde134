use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use color_eyre::eyre;
use common_services::access::AccessError;
use common_services::archive::ArchiveError;
use common_services::database::DbError;
use common_services::faces::ExtractorError;
use common_services::storage::StorageError;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// The error taxonomy the core exposes to callers. Pipeline-internal
/// failures never surface here; they land on the album row instead.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("too large: {0}")]
    TooLarge(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied")]
    Unauthorized { hint: Option<String> },

    #[error("Database error")]
    Database(#[from] DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Extractor error: {0}")]
    Extractor(#[from] ExtractorError),

    #[error("Access code error: {0}")]
    Access(#[from] AccessError),

    #[error("internal error")]
    Internal(#[from] eyre::Report),
}

fn log_error(error: &ServiceError) {
    match error {
        ServiceError::InvalidInput(message) => warn!("Invalid input: {}", message),
        ServiceError::TooLarge(message) => warn!("Limit exceeded: {}", message),
        ServiceError::NotFound(message) => warn!("Not found: {}", message),
        ServiceError::Unauthorized { .. } => warn!("Access denied"),
        ServiceError::Database(e) => warn!("Database query failed: {}", e),
        ServiceError::Storage(e) => warn!("Storage operation failed: {}", e),
        ServiceError::Archive(e) => warn!("Archive handling failed: {}", e),
        ServiceError::Extractor(e) => warn!("Extractor call failed: {}", e),
        ServiceError::Access(e) => warn!("Access code failure: {}", e),
        ServiceError::Internal(e) => warn!("Internal error: {:?}", e),
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        log_error(&self);

        let (status, body) = match self {
            Self::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Invalid input: {message}") }),
            ),
            Self::TooLarge(message) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "error": message }),
            ),
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("Not found: {message}") }),
            ),
            Self::Unauthorized { hint } => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "A valid recovery code is required.", "hint": hint }),
            ),
            Self::Storage(_) | Self::Extractor(_) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "An upstream dependency failed." }),
            ),
            Self::Archive(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("{message}") }),
            ),
            Self::Database(_) | Self::Access(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "An unexpected internal error occurred." }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
