//! API Error Types
//!
//! Every failure the account service can raise, and how each one is
//! rendered to HTTP clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Errors returned by the account service and its collaborators
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_)
            | ApiError::Database(_)
            | ApiError::Storage(_)
            | ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to a client
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg.clone(),
            ApiError::Database(_) | ApiError::Storage(_) | ApiError::Config(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed with internal error");
        }

        (
            status,
            Json(serde_json::json!({
                "statusCode": status.as_u16(),
                "message": self.public_message(),
                "success": false,
                "errors": []
            })),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ApiError::Conflict("User with email or username already exists".into());
            }
        }

        tracing::error!("Database error: {:?}", err);
        ApiError::Database(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        ApiError::Internal("Something went wrong while processing the password".into())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("Storage I/O error: {:?}", err);
        ApiError::Storage(err.to_string())
    }
}
