//! Internal error types for provider calls.
//!
//! These errors are internal to `mercato-providers` and are mapped to
//! [`ProviderError`] at the port boundary.

use mercato_core::ProviderError;
use thiserror::Error;

/// Result type alias for provider HTTP operations.
pub type ProviderResult<T> = Result<T, ProviderHttpError>;

#[derive(Debug, Error)]
pub enum ProviderHttpError {
    /// The provider answered with a non-success status.
    #[error("{url} answered {status}: {message}")]
    Status {
        status: u16,
        url: String,
        /// Error text extracted from the response body, if any.
        message: String,
    },

    /// The response parsed but did not carry what we expected.
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Local filesystem error (local object storage).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderHttpError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Network errors count only for requests that are `replay_safe`.
    pub(crate) fn is_transient(&self, replay_safe: bool) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Network(e) => replay_safe && !e.is_builder() && !e.is_decode(),
            _ => false,
        }
    }

    /// HTTP status of the failed response, if there was one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ProviderHttpError> for ProviderError {
    fn from(err: ProviderHttpError) -> Self {
        match err {
            ProviderHttpError::Status { status, message, .. } if status < 500 => {
                Self::Rejected { status, message }
            }
            ProviderHttpError::Status { .. }
            | ProviderHttpError::Network(_)
            | ProviderHttpError::Io(_) => Self::Unavailable(err.to_string()),
            ProviderHttpError::InvalidResponse { .. }
            | ProviderHttpError::JsonParse(_)
            | ProviderHttpError::InvalidUrl(_) => Self::InvalidResponse(err.to_string()),
        }
    }
}
