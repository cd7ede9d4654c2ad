use thiserror::Error;

use crate::error::ApiError;

/// Errors raised while acquiring or attaching credentials.
///
/// Only [`AuthError::Configuration`] is fatal. Everything else is a transient
/// acquisition failure that the retry loop absorbs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Identity platform error: {0}")]
    Identity(String),
    #[error("Signing error: {0}")]
    Signing(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    /// Whether another acquisition attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Configuration(message) => ApiError::Configuration(message),
            other => ApiError::Authentication(other.to_string()),
        }
    }
}
