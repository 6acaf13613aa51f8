use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{credentials::CredentialError, repository::RepositoryError, session::SessionError};

/// AppError
///
/// Every failure a request can end in. Handlers and services return
/// `Result<T, AppError>` and let `IntoResponse` render the JSON body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Absent, soft-deleted, or outside the caller's scope. Never more specific.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// ErrorBody
///
/// Wire shape of every error response: `{ "error": ..., "detail": ... }`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, detail) = match &self {
            AppError::Unauthorized => ("unauthorized", None),
            AppError::InvalidCredentials => ("invalid_credentials", None),
            AppError::Forbidden => ("forbidden", None),
            AppError::Validation(msg) => ("validation_error", Some(msg.clone())),
            AppError::NotFound(resource) => ("not_found", Some(format!("{resource} not found"))),
            AppError::Conflict(msg) => ("conflict", Some(msg.clone())),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                ("internal_error", None)
            }
        };

        let body = ErrorBody {
            error: error.to_string(),
            detail,
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(field) => AppError::Conflict(format!("{field} is already taken")),
            RepositoryError::Database(e) => AppError::Internal(format!("database error: {e}")),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Signing(e) => AppError::Internal(format!("token signing failed: {e}")),
            SessionError::Clock(e) => AppError::Internal(format!("system clock error: {e}")),
            SessionError::Expired | SessionError::Invalid => AppError::Unauthorized,
        }
    }
}

impl From<CredentialError> for AppError {
    /// Unknown email and wrong password collapse into one answer so callers
    /// cannot learn which accounts exist.
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Missing => {
                AppError::Validation("email and password are required".to_string())
            }
            CredentialError::UnknownEmail | CredentialError::WrongPassword => {
                AppError::InvalidCredentials
            }
            CredentialError::Hashing(msg) => AppError::Internal(msg),
            CredentialError::Repository(e) => e.into(),
        }
    }
}

/// Result type alias for handlers and services.
pub type Result<T> = std::result::Result<T, AppError>;
