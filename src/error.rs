//! HTTP-boundary error type.
//!
//! Every handler returns `Result<_, ApiError>`. Internal failures are logged where they are
//! converted and reach the client only as a generic message inside the usual envelope.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{auth::AuthError, collection::CollectionError, models::ApiResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Duplicate email on registration. Answered with 400, as clients of this API expect.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// Request body the JSON extractor refused. Keeps the extractor's own status.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// Store, hashing or signing failure. The message is the public one.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Logs `err` and wraps the public `message`.
    pub fn internal(message: impl Into<String>, err: impl std::fmt::Display) -> Self {
        let message = message.into();
        tracing::error!(error = %err, "{}", message);
        Self::Internal(message)
    }

    /// Maps a collection failure, naming the record type in the message.
    pub fn from_collection(err: CollectionError, label: &str, action: &str) -> Self {
        match err {
            CollectionError::NotFound => Self::NotFound(format!("{label} not found")),
            other => Self::internal(format!("Error {action} {}", label.to_lowercase()), other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Rejected { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserAlreadyExists => Self::Conflict("User already exists".to_string()),
            AuthError::InvalidCredentials => {
                Self::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::UserNotFound => Self::NotFound("User not found".to_string()),
            other => Self::internal("Internal server error", other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "request body rejected");
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ApiResponse::failure(self.to_string()))).into_response()
    }
}
