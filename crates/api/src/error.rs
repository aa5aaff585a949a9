//! Unified error handling with Sentry integration.
//!
//! Every failure leaves the API as `{"status":"error","error":"<message>"}`
//! with a status from a small taxonomy. Server errors are captured to Sentry
//! before responding, and their details are not sent to the client. All route
//! handlers return `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CartError, CatalogError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A unique key (e.g., email) is already taken.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Credentials are missing or wrong.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DuplicateKey(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Validation(msg)
            | Self::DuplicateKey(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "status": "error",
            "error": self.public_message(),
        });

        (self.status(), Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail(e) => Self::Validation(e.to_string()),
            AuthError::Validation(msg) => Self::Validation(msg),
            AuthError::AccountAlreadyExists => {
                Self::DuplicateKey("an account with this email already exists".to_string())
            }
            AuthError::InvalidCredentials => Self::Unauthorized("invalid credentials".to_string()),
            AuthError::MissingCredentials => Self::Unauthorized("missing credentials".to_string()),
            AuthError::InvalidToken => Self::Unauthorized("invalid token".to_string()),
            AuthError::AccountNotFound => Self::Forbidden("account no longer exists".to_string()),
            AuthError::UnknownAccount => Self::NotFound("account not found".to_string()),
            AuthError::ProfileNotFound => {
                Self::NotFound("store profile not found".to_string())
            }
            AuthError::Forbidden(role) => Self::Forbidden(format!("requires {role} role")),
            AuthError::Repository(RepositoryError::NotFound) => {
                Self::NotFound("account not found".to_string())
            }
            AuthError::Repository(e) => Self::Database(e),
            err @ (AuthError::PasswordHash | AuthError::TokenIssue(_)) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ProductNotFound => Self::Validation("not a product".to_string()),
            CartError::AccountNotFound => Self::Forbidden("account no longer exists".to_string()),
            CartError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => Self::NotFound("product not found".to_string()),
            CatalogError::Validation(msg) => Self::Validation(msg),
            CatalogError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for an authenticated account.
pub fn set_sentry_user(account_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use storekeep_core::Role;

    use super::*;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_taxonomy_status_codes() {
        assert_eq!(status_of(AuthError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::AccountAlreadyExists), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::MissingCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::InvalidToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::AccountNotFound), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AuthError::Forbidden(Role::Retailer)), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AuthError::UnknownAccount), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AuthError::ProfileNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(CartError::ProductNotFound), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(CatalogError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AuthError::PasswordHash),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = AppError::from(CartError::ProductNotFound).into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "not a product");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err = AppError::Internal("connection string leaked".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("leaked"));
        assert!(text.contains("Internal server error"));
    }
}
