//! OAuth 2.0 client-credentials token acquisition with caching.

use std::sync::Arc;

use async_trait::async_trait;
use bon::Builder;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::error::AuthError;
use super::provider::ParameterSource;
use super::store::TokenCache;
use super::token::TokenResponse;
use crate::util::retry::{RetryExhausted, RetryPolicy};

/// Parameters of a client-credentials token request.
///
/// Every field may be left unset at construction. They are checked when a
/// token request actually has to be made.
///
/// # Example
/// ```
/// use apikit::auth::OAuthRequest;
///
/// let request = OAuthRequest::builder()
///     .endpoint("https://login.example.com/oauth2/token")
///     .client_id("my-app")
///     .client_secret("s3cret")
///     .resource("https://api.example.com")
///     .build();
/// assert!(request.form().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthRequest {
    #[builder(into)]
    pub endpoint: Option<String>,
    #[builder(into)]
    pub client_id: Option<String>,
    #[builder(into)]
    pub client_secret: Option<String>,
    #[builder(into)]
    pub resource: Option<String>,
}

impl OAuthRequest {
    /// Read `APIKIT_OAUTH_ENDPOINT`, `APIKIT_OAUTH_CLIENT_ID`,
    /// `APIKIT_OAUTH_CLIENT_SECRET` and `APIKIT_OAUTH_RESOURCE`, loading a
    /// `.env` file first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (env-style keys).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            endpoint: lookup("APIKIT_OAUTH_ENDPOINT"),
            client_id: lookup("APIKIT_OAUTH_CLIENT_ID"),
            client_secret: lookup("APIKIT_OAUTH_CLIENT_SECRET"),
            resource: lookup("APIKIT_OAUTH_RESOURCE"),
        }
    }

    /// Validate the request and build its form body.
    pub fn form(&self) -> Result<ClientCredentialsForm, AuthError> {
        Ok(ClientCredentialsForm {
            endpoint: required(&self.endpoint, "endpoint")?,
            client_id: required(&self.client_id, "client_id")?,
            client_secret: required(&self.client_secret, "client_secret")?,
            resource: required(&self.resource, "resource")?,
        })
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String, AuthError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AuthError::Configuration(format!("OAuth request is missing {name}")))
}

/// A validated client-credentials request.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentialsForm {
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub resource: String,
}

impl std::fmt::Debug for ClientCredentialsForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsForm")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"..")
            .field("resource", &self.resource)
            .finish()
    }
}

impl ClientCredentialsForm {
    /// Form-encoded body fields, in wire order.
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("resource", self.resource.as_str()),
        ]
    }
}

/// Issues a token request. Injected so the network call can be replaced.
#[async_trait]
pub trait TokenRequester: Send + Sync {
    async fn request_token(&self, form: &ClientCredentialsForm) -> Result<TokenResponse, AuthError>;
}

/// [`TokenRequester`] that POSTs the form with reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpTokenRequester {
    client: reqwest::Client,
}

impl HttpTokenRequester {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenRequester for HttpTokenRequester {
    async fn request_token(&self, form: &ClientCredentialsForm) -> Result<TokenResponse, AuthError> {
        let resp = self
            .client
            .post(&form.endpoint)
            .header("Accept", "application/json")
            .form(&form.pairs())
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "Token request failed with status {}",
                resp.status()
            )));
        }
        let body = resp.text().await?;
        let payload: TokenResponse = serde_json::from_str(&body)?;
        if payload.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "Token response has an empty access_token".to_string(),
            ));
        }
        Ok(payload)
    }
}

enum Acquired {
    Cached(String),
    Issued(TokenResponse),
}

/// Client-credentials provider backed by a [`TokenCache`].
///
/// A valid cached token is returned without touching the network. Otherwise
/// up to [`RetryPolicy::max_attempts`] token requests are made, sleeping with
/// exponential backoff between them. If all of them fail, or the provider's
/// cancellation token fires during a backoff, the result is `Ok(None)` and the
/// request goes out unauthenticated. Only a missing request parameter is an
/// error.
///
/// Concurrent callers are not coalesced: two tasks that both find the cache
/// expired will both request a token, and the last write wins.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use apikit::auth::{ClientCredentialsProvider, HeaderAuth, OAuthRequest, TokenCache};
///
/// let provider = ClientCredentialsProvider::new(OAuthRequest::from_env(), TokenCache::in_memory());
/// let auth = HeaderAuth::bearer(Arc::new(provider));
/// ```
pub struct ClientCredentialsProvider {
    request: OAuthRequest,
    cache: TokenCache,
    requester: Arc<dyn TokenRequester>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ClientCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsProvider")
            .field("endpoint", &self.request.endpoint)
            .field("client_id", &self.request.client_id)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ClientCredentialsProvider {
    pub fn new(request: OAuthRequest, cache: TokenCache) -> Self {
        Self {
            request,
            cache,
            requester: Arc::new(HttpTokenRequester::default()),
            retry: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_requester(mut self, requester: Arc<dyn TokenRequester>) -> Self {
        self.requester = requester;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Return a usable access token, refreshing it if needed.
    pub async fn acquire_access_token(&self) -> Result<Option<String>, AuthError> {
        self.acquire_access_token_with(&self.cancel).await
    }

    /// Like [`Self::acquire_access_token`], observing `cancel` instead of the
    /// provider's own token.
    pub async fn acquire_access_token_with(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, AuthError> {
        if let Some(cached) = self.cache.valid_at(Utc::now()) {
            tracing::debug!(expires_at = %cached.expires_at, "Valid token in cache");
            return Ok(Some(cached.value));
        }

        let form = self.request.form()?;
        let outcome = self
            .retry
            .execute(cancel, |attempt| {
                let form = &form;
                async move {
                    // Another caller may have refreshed while we were sleeping.
                    if let Some(cached) = self.cache.valid_at(Utc::now()) {
                        return Ok(Acquired::Cached(cached.value));
                    }
                    tracing::info!(attempt, endpoint = %form.endpoint, "Requesting access token");
                    self.requester.request_token(form).await.map(Acquired::Issued)
                }
            })
            .await?;

        match outcome {
            Ok(Acquired::Cached(value)) => Ok(Some(value)),
            Ok(Acquired::Issued(response)) => {
                tracing::debug!(
                    expires_in = response.expires_in,
                    expires_on = response.expires_on,
                    "Access token acquired"
                );
                if let Err(err) = self.cache.set(&response.access_token, response.expires_in) {
                    tracing::warn!(error = %err, "Failed to cache access token");
                }
                Ok(Some(response.access_token))
            }
            Err(RetryExhausted::Attempts { last_error }) => {
                tracing::warn!(
                    max_attempts = self.retry.max_attempts,
                    error = ?last_error.map(|e| e.to_string()),
                    "Giving up on token acquisition"
                );
                Ok(None)
            }
            Err(RetryExhausted::Cancelled) => Ok(None),
        }
    }

    /// Blocking form of [`Self::acquire_access_token`].
    ///
    /// Drives the async path on a private current-thread runtime, so it must
    /// not be called from inside another tokio runtime.
    pub fn acquire_access_token_blocking(&self) -> Result<Option<String>, AuthError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.acquire_access_token())
    }
}

#[async_trait]
impl ParameterSource for ClientCredentialsProvider {
    async fn parameter(
        &self,
        _request: &mut reqwest::Request,
    ) -> Result<Option<String>, AuthError> {
        self.acquire_access_token().await
    }
}
