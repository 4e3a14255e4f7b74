//! HTTP error types for the Lockbox server.
//!
//! Maps [`VaultError`] into HTTP responses. Every error produces a JSON body
//! with a machine-readable `error` field and a human-readable `message`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, warn};

use lockbox_core::VaultError;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// The vault is sealed. Reject all data-plane operations.
    Sealed,
    /// Authentication failed or token invalid.
    Unauthorized(String),
    /// The caller may not perform the operation.
    Forbidden(String),
    /// Requested resource not found.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// Lifecycle conflict (already initialized, sealed, or unsealed).
    Conflict(String),
    /// Internal server error.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::Sealed => (
                StatusCode::FORBIDDEN,
                "sealed",
                "vault is sealed".to_owned(),
            ),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        if status.is_server_error() {
            warn!(status = status.as_u16(), error = error_type, %message, "request failed");
        } else {
            debug!(status = status.as_u16(), error = error_type, %message, "request rejected");
        }

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Sealed => Self::Sealed,

            VaultError::InvalidToken
            | VaultError::TokenExpired { .. }
            | VaultError::InvalidRootToken => Self::Unauthorized(err.to_string()),

            VaultError::PermissionDenied { .. } => Self::Forbidden(err.to_string()),

            VaultError::NotFound { .. } => Self::NotFound(err.to_string()),

            VaultError::AlreadyInitialized
            | VaultError::AlreadySealed
            | VaultError::AlreadyUnsealed => Self::Conflict(err.to_string()),

            VaultError::NotInitialized
            | VaultError::InvalidUnsealKeyFormat { .. }
            | VaultError::InvalidUnsealKey
            | VaultError::MalformedRequest { .. } => Self::BadRequest(err.to_string()),

            VaultError::Storage(_) | VaultError::Decryption { .. } | VaultError::Encryption { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use lockbox_storage::StorageError;

    use super::*;

    fn status_of(err: VaultError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn sealed_is_forbidden_class() {
        assert_eq!(status_of(VaultError::Sealed), StatusCode::FORBIDDEN);
    }

    #[test]
    fn auth_failures_are_unauthorized() {
        assert_eq!(status_of(VaultError::InvalidToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(VaultError::InvalidRootToken), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(VaultError::TokenExpired {
                expired_at: chrono::Utc::now()
            }),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn lifecycle_conflicts() {
        assert_eq!(status_of(VaultError::AlreadyInitialized), StatusCode::CONFLICT);
        assert_eq!(status_of(VaultError::AlreadySealed), StatusCode::CONFLICT);
        assert_eq!(status_of(VaultError::AlreadyUnsealed), StatusCode::CONFLICT);
    }

    #[test]
    fn client_errors_are_bad_request() {
        assert_eq!(status_of(VaultError::NotInitialized), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(VaultError::InvalidUnsealKey), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(VaultError::malformed("bad path")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn backend_failures_are_internal() {
        let storage = VaultError::Storage(StorageError::Transaction {
            reason: "disk gone".to_owned(),
        });
        assert_eq!(status_of(storage), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_of(VaultError::Decryption {
                reason: "tag".to_owned()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn other_mappings() {
        assert_eq!(
            status_of(VaultError::PermissionDenied {
                reason: "root only".to_owned()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(VaultError::NotFound {
                resource: "secret/x".to_owned()
            }),
            StatusCode::NOT_FOUND
        );
    }
}
