//! Axum-specific error types and mappings.
//!
//! Maps [`CoreError`] to HTTP status codes and the JSON error body
//! `{ "error", "status", "fields"? }`.

use std::collections::BTreeMap;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use mercato_core::{CoreError, ProviderError, RepositoryError};
use serde::Serialize;
use thiserror::Error;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Bad request (malformed or invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Input failed validation; carries per-field messages.
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    /// Missing or invalid session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (or not visible to the caller).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict with the current state of the resource.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An upstream provider failed or answered badly.
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// A feature is not configured on this server.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
}

impl HttpError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let (message, fields) = match self {
            Self::Validation(fields) => ("Validation failed".to_string(), Some(fields)),
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::BadGateway(msg)
            | Self::ServiceUnavailable(msg) => (msg, None),
            // Internal details stay in the log.
            Self::Internal(_) => ("Internal server error".to_string(), None),
        };

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
            fields,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Repository(repo_err) => repo_err.into(),
            CoreError::Provider(provider_err) => provider_err.into(),
            CoreError::Settings(settings_err) => HttpError::BadRequest(settings_err.to_string()),
            CoreError::Validation(errors) => HttpError::Validation(errors.fields().clone()),
            CoreError::Unauthorized(msg) => HttpError::Unauthorized(msg),
            CoreError::Forbidden(msg) => HttpError::Forbidden(msg),
            CoreError::NotFound(msg) => HttpError::NotFound(msg),
            CoreError::Conflict(msg) => HttpError::Conflict(msg),
            CoreError::Configuration(msg) => HttpError::ServiceUnavailable(msg),
            CoreError::Internal(msg) => HttpError::Internal(msg),
        }
    }
}

impl From<RepositoryError> for HttpError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => HttpError::NotFound(msg),
            RepositoryError::AlreadyExists(msg) | RepositoryError::Constraint(msg) => {
                HttpError::Conflict(msg)
            }
            RepositoryError::Storage(msg) => HttpError::Internal(format!("Storage: {msg}")),
            RepositoryError::Serialization(msg) => {
                HttpError::Internal(format!("Serialization: {msg}"))
            }
        }
    }
}

impl From<ProviderError> for HttpError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidSignature(_) => HttpError::BadRequest(err.to_string()),
            ProviderError::NotConfigured(_) => HttpError::ServiceUnavailable(err.to_string()),
            ProviderError::Rejected { .. }
            | ProviderError::Unavailable(_)
            | ProviderError::InvalidResponse(_) => HttpError::BadGateway(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercato_core::ValidationErrors;

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (CoreError::invalid("title", "required"), StatusCode::BAD_REQUEST),
            (CoreError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (CoreError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (CoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CoreError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                RepositoryError::Constraint("fk".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                ProviderError::Unavailable("down".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ProviderError::InvalidSignature("bad".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ProviderError::NotConfigured("payments".into()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (CoreError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(HttpError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_validation_carries_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("client_email", "is required");
        let HttpError::Validation(fields) = HttpError::from(CoreError::Validation(errors)) else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("client_email").map(String::as_str), Some("is required"));
    }

    #[test]
    fn test_unauthorized_sets_challenge_header() {
        let response = HttpError::Unauthorized("no session".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
