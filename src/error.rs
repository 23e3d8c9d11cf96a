//! Request-level error taxonomy.
//!
//! Every handler failure maps onto one of these variants; the JSON body
//! shape is `{"error": "...", "code": <status>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    /// District, place, user, or route absent.
    NotFound(String),
    /// Malformed filter/query/body parameters.
    Validation(String),
    /// Geocoding/directions service non-OK, timeout, or malformed payload.
    Upstream(String),
    /// Database unreachable or query error. Surfaced with a generic message.
    Storage(String),
    Unauthorized(String),
    Forbidden(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "{}", msg),
            Self::Validation(msg) => write!(f, "{}", msg),
            Self::Upstream(msg) => write!(f, "Upstream service error: {}", msg),
            // Storage detail stays in the server log, not the response.
            Self::Storage(_) => write!(f, "Veritabanı hatası"),
            Self::Unauthorized(msg) => write!(f, "{}", msg),
            Self::Forbidden(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Storage(ref detail) = self {
            eprintln!(
                "[{}] storage error: {}",
                chrono::Utc::now().format("%H:%M:%S"),
                detail
            );
        }
        let status = self.status();
        let body = ApiErrorBody {
            error: self.to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<crate::storage::StorageError> for ApiError {
    fn from(err: crate::storage::StorageError) -> Self {
        match err {
            crate::storage::StorageError::NotFound(what) => Self::NotFound(what),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<crate::auth::AuthError> for ApiError {
    fn from(err: crate::auth::AuthError) -> Self {
        use crate::auth::AuthError;
        match err {
            AuthError::Validation(msg) => Self::Validation(msg),
            AuthError::Storage(err) => err.into(),
            AuthError::Internal(msg) => Self::Storage(msg),
            other @ AuthError::InvalidCredentials => Self::Unauthorized(other.to_string()),
            other @ AuthError::InvalidToken => Self::Forbidden(other.to_string()),
        }
    }
}

impl From<crate::places::PlaceError> for ApiError {
    fn from(err: crate::places::PlaceError) -> Self {
        match err {
            crate::places::PlaceError::NotFound(what) => Self::NotFound(what),
            crate::places::PlaceError::Storage(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::Storage("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_storage_message_is_generic() {
        let err = ApiError::Storage("secret connection string".into());
        assert!(!err.to_string().contains("secret"));
    }
}
