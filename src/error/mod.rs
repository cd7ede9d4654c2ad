//! Error types for apikit.

pub mod problem;

pub use problem::{FieldErrors, ProblemDetails};

use thiserror::Error;

/// Primary error type for request execution.
///
/// Failures below the credential boundary never show up here: they are turned
/// into sentinels (absent token, absent signature, unset resource). What
/// remains is configuration mistakes and transport-level failures.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Io,
    Serialization,
    Authentication,
    InvalidArgument,
}

impl ApiError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Network(_) => ErrorCategory::Network,
            Self::Io(_) => ErrorCategory::Io,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::InvalidArgument(_) => ErrorCategory::InvalidArgument,
        }
    }

    /// Whether repeating the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ApiError>;
