//! Crate-level error type and user-facing error bodies

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::{RepositoryError, RepositoryErrorKind};

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Query core error with operation context
    #[error("{0}")]
    Repository(RepositoryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tracing subscriber could not be installed
    #[error("Tracing error: {0}")]
    Tracing(String),
}

impl Error {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Repository(e) => repository_code(e.kind),
            Error::Io(_) => "IO_ERROR",
            Error::Tracing(_) => "TRACING_ERROR",
        }
    }

    /// The repository error, if this wraps one
    pub fn as_repository(&self) -> Option<&RepositoryError> {
        match self {
            Error::Repository(e) => Some(e),
            _ => None,
        }
    }
}

fn repository_code(kind: RepositoryErrorKind) -> &'static str {
    match kind {
        RepositoryErrorKind::InvalidArgument => "INVALID_ARGUMENT",
        RepositoryErrorKind::NotFound => "NOT_FOUND",
        RepositoryErrorKind::AlreadyExists => "ALREADY_EXISTS",
        RepositoryErrorKind::Cancelled => "CANCELLED",
        RepositoryErrorKind::CycleDetected | RepositoryErrorKind::DepthExceeded => {
            "INVALID_HIERARCHY"
        }
        RepositoryErrorKind::Unexpected => "UNEXPECTED",
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        Error::Repository(err)
    }
}

/// Error body safe to show to a caller
///
/// Repository errors are reduced to their user message, so source failures
/// never leak internal detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Error code
    pub code: String,

    /// Offending input field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            field: None,
        }
    }
}

impl From<&RepositoryError> for ErrorResponse {
    fn from(err: &RepositoryError) -> Self {
        Self {
            error: err.user_message(),
            code: repository_code(err.kind).to_string(),
            field: err.field.clone(),
        }
    }
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        match err {
            Error::Repository(e) => Self::from(e),
            other => Self::new(other.code(), other.to_string()),
        }
    }
}
