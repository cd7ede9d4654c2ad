//! Tokens sourced from an external identity platform.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::AuthError;
use super::provider::ParameterSource;
use crate::util::retry::{RetryExhausted, RetryPolicy};

/// Identity platform that owns the signed-in user and caches their ID token.
#[async_trait]
pub trait IdentityPlatform: Send + Sync {
    /// Whether a user is currently signed in.
    fn has_current_user(&self) -> bool;

    /// Retrieve the current user's ID token.
    ///
    /// `Ok(None)` means the platform completed the call but had no token.
    async fn id_token(&self, force_refresh: bool) -> Result<Option<String>, AuthError>;
}

/// Provider that asks an [`IdentityPlatform`] for the signed-in user's token.
///
/// Uses the same bounded retry as [`super::ClientCredentialsProvider`] but
/// does no caching of its own. Each attempt is a fresh retrieval.
pub struct FederatedTokenProvider {
    platform: Arc<dyn IdentityPlatform>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl std::fmt::Debug for FederatedTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedTokenProvider")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl FederatedTokenProvider {
    pub fn new(platform: Arc<dyn IdentityPlatform>) -> Self {
        Self {
            platform,
            retry: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn acquire_access_token(&self) -> Result<Option<String>, AuthError> {
        if !self.platform.has_current_user() {
            tracing::debug!("No signed-in user, skipping token retrieval");
            return Ok(None);
        }

        let outcome = self
            .retry
            .execute(&self.cancel, |attempt| async move {
                tracing::debug!(attempt, "Retrieving identity token");
                self.platform.id_token(false).await
            })
            .await?;

        match outcome {
            Ok(token) => Ok(token.filter(|t| !t.is_empty())),
            Err(RetryExhausted::Attempts { last_error }) => {
                tracing::warn!(
                    max_attempts = self.retry.max_attempts,
                    error = ?last_error.map(|e| e.to_string()),
                    "Giving up on identity token retrieval"
                );
                Ok(None)
            }
            Err(RetryExhausted::Cancelled) => Ok(None),
        }
    }

    /// Blocking form of [`Self::acquire_access_token`]. Not for use inside a tokio runtime.
    pub fn acquire_access_token_blocking(&self) -> Result<Option<String>, AuthError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.acquire_access_token())
    }
}

#[async_trait]
impl ParameterSource for FederatedTokenProvider {
    async fn parameter(
        &self,
        _request: &mut reqwest::Request,
    ) -> Result<Option<String>, AuthError> {
        self.acquire_access_token().await
    }
}
