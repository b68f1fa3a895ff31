//! Error handling for the backend API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use medcards_core::EngineError;
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    #[error("Invalid hint: {0}")]
    InvalidHint(String),

    #[error("Invalid case: {0}")]
    InvalidCase(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Concurrent update: {0}")]
    ConcurrentUpdate(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::InvalidAnswer(_) => (StatusCode::BAD_REQUEST, "invalid_answer"),
            ApiError::InvalidHint(_) => (StatusCode::BAD_REQUEST, "invalid_hint"),
            ApiError::InvalidCase(_) => (StatusCode::BAD_REQUEST, "invalid_case"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::ConcurrentUpdate(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "concurrent_update_conflict")
            }
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Migration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "migration_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::NotFound { .. } => ApiError::NotFound(message),
            EngineError::InvalidAnswer { .. } => ApiError::InvalidAnswer(message),
            EngineError::InvalidHint { .. } => ApiError::InvalidHint(message),
            EngineError::InvalidCase { .. } => ApiError::InvalidCase(message),
            EngineError::InvalidMessage(_) => ApiError::BadRequest(message),
            EngineError::ConcurrentUpdateConflict { .. } => ApiError::ConcurrentUpdate(message),
            // Adapter failures are recovered in the scoring service; reaching
            // here means one escaped.
            EngineError::AdapterTimeout { .. } | EngineError::AdapterError(_) => {
                ApiError::Internal(message)
            }
        }
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        let error = ApiError::NotFound("case c1".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bad_request_status() {
        let error = ApiError::BadRequest("invalid input".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_status() {
        let error = ApiError::Internal("unexpected error".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_migration_error_status() {
        let error = ApiError::Migration("migration failed".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_engine_errors_map_to_client_errors() {
        let cases = [
            (EngineError::not_found("user", "u1"), StatusCode::NOT_FOUND),
            (
                EngineError::InvalidAnswer {
                    case_id: "c1".to_string(),
                    selected: "Z".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::InvalidHint {
                    case_id: "c1".to_string(),
                    level: 7,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::InvalidCase {
                    case_id: "c1".to_string(),
                    reason: "no options".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::InvalidMessage("empty content".to_string()),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_conflict_exhaustion_is_transient() {
        let error = ApiError::from(EngineError::ConcurrentUpdateConflict {
            user_id: "u1".to_string(),
            attempts: 5,
        });
        assert_eq!(
            error.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_display_not_found() {
        let error = ApiError::from(EngineError::not_found("case", "c9"));
        assert_eq!(error.to_string(), "Not found: case not found: c9");
    }

    #[test]
    fn test_error_display_bad_request() {
        let error = ApiError::BadRequest("missing field".to_string());
        assert_eq!(error.to_string(), "Bad request: missing field");
    }
}
