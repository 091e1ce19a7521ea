use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Error taxonomy at the HTTP boundary. Services construct the domain
/// variants directly; infrastructure failures convert through `From`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Session has been revoked")]
    SessionRevoked,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("CSRF token missing or invalid")]
    CsrfRejected,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Cannot revoke your own admin role")]
    SelfRevocationForbidden,

    #[error("User already holds an admin role")]
    AlreadyPrivileged,

    #[error("{0}")]
    Validation(String),

    #[error("Too many attempts, please try again later")]
    RateLimited,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials
            | ApiError::Unauthenticated
            | ApiError::SessionRevoked => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::CsrfRejected => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_)
            | ApiError::SelfRevocationForbidden
            | ApiError::AlreadyPrivileged => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the logs, never in the response body.
        let message = match &self {
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(e: bcrypt::BcryptError) -> Self {
        ApiError::Internal(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::SessionRevoked.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::CsrfRejected.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::NotFound("user not found".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::AlreadyPrivileged.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::SelfRevocationForbidden.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn generic_credentials_message_reveals_no_factor() {
        let msg = ApiError::InvalidCredentials.to_string();
        assert!(!msg.to_lowercase().contains("pin"));
        assert!(!msg.to_lowercase().contains("password"));
    }
}
