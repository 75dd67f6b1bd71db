//! Error types for the compliance portal.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    /// No valid session was presented.
    #[error("Unauthorized")]
    Unauthorized,

    /// The actor's role or identity does not permit the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A required transition payload (file reference, rejection reason) is missing.
    #[error("Missing payload: {0}")]
    MissingPayload(String),

    /// The requested event is not defined for the record's current status.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The record is in a terminal status and accepts no further transitions.
    #[error("Terminal state: {0}")]
    TerminalState(String),

    /// A concurrent write advanced the record's revision first.
    #[error("Conflict: {0}")]
    Conflict(String),

    // === Server Errors ===
    /// A collaborator (database, blob store, auth) timed out or failed.
    #[error("Transient failure: {0}")]
    TransientFailure(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Validation(_) | Self::MissingPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidTransition(_) | Self::TerminalState(_) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }

            // 5xx Server Errors
            Self::TransientFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Storage(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MissingPayload(_) => "MISSING_PAYLOAD",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::TerminalState(_) => "TERMINAL_STATE",
            Self::Conflict(_) => "CONFLICT",
            Self::TransientFailure(_) => "TRANSIENT_FAILURE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Returns whether the caller may re-read the record and try again.
    ///
    /// Validation-style rejections are permanent; only lost races and
    /// collaborator outages are retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::TransientFailure(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_errors_are_client_errors() {
        for err in [
            AppError::InvalidTransition("pending -> verify".to_string()),
            AppError::TerminalState("verified".to_string()),
            AppError::MissingPayload("reason".to_string()),
            AppError::Forbidden("admin only".to_string()),
        ] {
            assert!(!err.is_server_error(), "{err}");
            assert!(!err.is_retryable(), "{err}");
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AppError::Conflict("revision 3".to_string()).is_retryable());
        assert!(AppError::TransientFailure("timeout".to_string()).is_retryable());
        assert!(!AppError::NotFound("v1".to_string()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::TerminalState(String::new()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::TransientFailure(String::new()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::MissingPayload(String::new()).error_code(), "MISSING_PAYLOAD");
    }
}
