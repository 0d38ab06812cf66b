//! Error types for ffs-server
//!
//! Every failure carries enough context (tournament id, round, offending ids) to
//! be logged and diagnosed. The HTTP mapping never copies storage-layer detail
//! into the client-facing message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Main error type for ffs-server
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown tournament, user pointer not set, etc. (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected before any mutation: foreign ids, stale round, empty playlist (400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Lost a race or acted on a state that moved on; safe to retry (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The eligibility store contradicts itself; not auto-repaired (500)
    #[error("Inconsistent bracket state in tournament {tournament_id} at round {round}: {detail}")]
    InvariantViolation {
        tournament_id: i64,
        round: i64,
        detail: String,
    },

    /// Transaction could not complete; rolled back (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// ffs-common error
    #[error("Common error: {0}")]
    Common(#[from] ffs_common::Error),
}

/// Convenience Result type using ffs-server Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a client may simply repeat the request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Conflict(_) | Error::Database(_) | Error::Common(ffs_common::Error::Database(_))
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let retryable = self.is_retryable();
        let (status, error_code, message) = match self {
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            Error::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            Error::InvariantViolation { .. } => {
                error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INCONSISTENT_STATE",
                    "Tournament state is inconsistent".to_string(),
                )
            }
            Error::Database(ref err) => {
                error!("Storage failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Storage failure, please retry".to_string(),
                )
            }
            Error::Common(ref err) => {
                error!("{}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "retryable": retryable,
            }
        }));

        (status, body).into_response()
    }
}
