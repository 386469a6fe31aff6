//! CLI-specific error types and mappings.
//!
//! Maps [`CoreError`] to process exit codes and user-facing messages.

use mercato_core::CoreError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Core domain error without a more specific category.
    #[error("{0}")]
    Core(String),

    /// Input rejected by validation.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// The named account or record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// An external provider failed.
    #[error("External service: {0}")]
    Unavailable(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Core(_) => 1,
            Self::Arguments(_) => 2,
            Self::NotFound(_) => 67,    // EX_NOUSER
            Self::Unavailable(_) => 69, // EX_UNAVAILABLE
            Self::Database(_) => 73,    // EX_CANTCREAT (closest fit)
            Self::Config(_) => 78,      // EX_CONFIG
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Repository(mercato_core::RepositoryError::NotFound(msg))
            | CoreError::NotFound(msg) => Self::NotFound(msg),
            CoreError::Repository(repo_err) => Self::Database(repo_err.to_string()),
            CoreError::Provider(provider_err) => Self::Unavailable(provider_err.to_string()),
            CoreError::Settings(settings_err) => Self::Config(settings_err.to_string()),
            CoreError::Validation(errors) => Self::Arguments(errors.to_string()),
            CoreError::Configuration(msg) => Self::Config(msg),
            CoreError::Unauthorized(msg)
            | CoreError::Forbidden(msg)
            | CoreError::Conflict(msg)
            | CoreError::Internal(msg) => Self::Core(msg),
        }
    }
}
