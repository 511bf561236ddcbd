//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::repositories::RepositoryError;

/// Application-wide error type.
///
/// The first group of variants is raised by the consistency services and the
/// ledger client. The second group is raised by the HTTP boundary only.
///
/// # Error Categories
///
/// - **Lookup Errors**: referenced customer or account does not exist
/// - **Business Rule Errors**: an invariant would be violated by the request
/// - **Ownership Errors**: the caller does not own the resource
/// - **Atomic Write Errors**: a multi-entity write was rolled back
/// - **Upstream Errors**: the external ledger failed
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Referenced customer or account does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0}")]
    EntityNotFound(String),

    /// A business invariant is violated (wrong role, wrong currency,
    /// deactivated entity, duplicate account, invalid transaction type).
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    EntityConflict(String),

    /// Caller is not the owner of the resource.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("{0}")]
    AuthorizationFailed(String),

    /// Password verification failed.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("The credentials are not correct.")]
    WrongCredentials,

    /// An atomic multi-entity write failed and was rolled back.
    ///
    /// The underlying storage error is logged, never returned.
    /// Returns HTTP 503 Service Unavailable.
    #[error("Transaction failed.")]
    TransactionFailed,

    /// The ledger answered with a 5xx status.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Invalid response from the upstream server.")]
    BadGateway,

    /// The ledger could not be reached or rejected the request.
    ///
    /// Returns HTTP 503 Service Unavailable.
    #[error("Request to the service failed.")]
    ServiceUnavailable,

    /// Bearer token is missing, malformed, expired or forged.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid access token")]
    InvalidToken,

    /// Caller role is not allowed to use the route.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Access to this resource is forbidden")]
    Forbidden,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Unexpected storage failure outside of a unit of work.
    ///
    /// Returns HTTP 500 Internal Server Error (hides details from client).
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Unexpected failure outside of storage (signing, serialization).
    ///
    /// Returns HTTP 500 Internal Server Error (hides details from client).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::EntityNotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::EntityConflict(message.into())
    }

    /// Stable machine-readable code used in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::EntityNotFound(_) => "entity_not_found",
            AppError::EntityConflict(_) => "entity_conflict",
            AppError::AuthorizationFailed(_) => "authorization_failed",
            AppError::WrongCredentials => "wrong_credentials",
            AppError::TransactionFailed => "transaction_failed",
            AppError::BadGateway => "bad_gateway",
            AppError::ServiceUnavailable => "service_unavailable",
            AppError::InvalidToken => "invalid_token",
            AppError::Forbidden => "forbidden",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Repository(_) | AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::EntityConflict(_) => StatusCode::CONFLICT,
            AppError::AuthorizationFailed(_) | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::WrongCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::TransactionFailed | AppError::ServiceUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::BadGateway => StatusCode::BAD_GATEWAY,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Repository(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "entity_conflict",
///     "message": "Customer with id ... is deactivated."
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Repository(ref err) => {
                tracing::error!(error = %err, "Unhandled repository error");
                "An internal error occurred".to_string()
            }
            AppError::Internal(ref detail) => {
                tracing::error!(detail = %detail, "Internal error");
                "An internal error occurred".to_string()
            }
            ref other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
