//! Request authorization strategies.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};

use super::error::AuthError;
use super::shared_key::{SharedKeySigner, DEFAULT_SHARED_KEY_SCHEME};

/// Scheme used by token-based providers.
pub const DEFAULT_BEARER_SCHEME: &str = "Bearer";

/// Prepares an outgoing request before it is sent.
///
/// Only configuration mistakes are returned as errors. A provider that
/// cannot obtain a credential lets the request go out unauthenticated and
/// the server's 401 becomes the caller's signal.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authorize(&self, request: &mut reqwest::Request) -> Result<(), AuthError>;
}

/// Produces the parameter half of an `Authorization: <scheme> <parameter>` header.
///
/// Sources receive the request mutably so they can attach headers they sign
/// over (see [`SharedKeySigner`]). `Ok(None)` means "no credential available".
#[async_trait]
pub trait ParameterSource: Send + Sync {
    async fn parameter(&self, request: &mut reqwest::Request)
        -> Result<Option<String>, AuthError>;
}

/// Leaves requests untouched.
///
/// Use it for anonymous endpoints, or to discover the schemes a server
/// accepts from the `WWW-Authenticate` header of its 401.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
    async fn authorize(&self, _request: &mut reqwest::Request) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Sets `Authorization: <scheme> <parameter>` from a [`ParameterSource`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use apikit::auth::{HeaderAuth, StaticToken};
///
/// let auth = HeaderAuth::bearer(Arc::new(StaticToken::new("api-key")));
/// ```
#[derive(Clone)]
pub struct HeaderAuth {
    scheme: String,
    source: Arc<dyn ParameterSource>,
}

impl std::fmt::Debug for HeaderAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderAuth")
            .field("scheme", &self.scheme)
            .field("source", &"..")
            .finish()
    }
}

impl HeaderAuth {
    pub fn new(scheme: impl Into<String>, source: Arc<dyn ParameterSource>) -> Self {
        Self {
            scheme: scheme.into(),
            source,
        }
    }

    pub fn bearer(source: Arc<dyn ParameterSource>) -> Self {
        Self::new(DEFAULT_BEARER_SCHEME, source)
    }

    pub fn shared_key(signer: SharedKeySigner) -> Self {
        Self::new(DEFAULT_SHARED_KEY_SCHEME, Arc::new(signer))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }
}

#[async_trait]
impl AuthProvider for HeaderAuth {
    async fn authorize(&self, request: &mut reqwest::Request) -> Result<(), AuthError> {
        let Some(parameter) = self.source.parameter(request).await? else {
            tracing::debug!(
                scheme = %self.scheme,
                url = %request.url(),
                "No credential available, sending request without Authorization"
            );
            return Ok(());
        };

        match HeaderValue::from_str(&format!("{} {parameter}", self.scheme)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(err) => {
                tracing::warn!(
                    scheme = %self.scheme,
                    error = %err,
                    "Credential is not a valid header value, sending request without Authorization"
                );
            }
        }
        Ok(())
    }
}

/// A fixed credential such as an API key.
#[derive(Clone)]
pub struct StaticToken(String);

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticToken").field(&"..").finish()
    }
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl ParameterSource for StaticToken {
    async fn parameter(
        &self,
        _request: &mut reqwest::Request,
    ) -> Result<Option<String>, AuthError> {
        Ok(Some(self.0.clone()).filter(|token| !token.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, Url};

    fn request() -> reqwest::Request {
        reqwest::Request::new(Method::GET, Url::parse("https://api.example.com/v1/items").unwrap())
    }

    struct Absent;

    #[async_trait]
    impl ParameterSource for Absent {
        async fn parameter(
            &self,
            _request: &mut reqwest::Request,
        ) -> Result<Option<String>, AuthError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn no_auth_leaves_request_untouched() {
        let mut req = request();
        NoAuth.authorize(&mut req).await.unwrap();
        assert!(req.headers().is_empty());
    }

    #[tokio::test]
    async fn header_auth_joins_scheme_and_parameter() {
        let auth = HeaderAuth::bearer(Arc::new(StaticToken::new("abc123")));
        let mut req = request();
        auth.authorize(&mut req).await.unwrap();
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer abc123");
    }

    #[tokio::test]
    async fn custom_scheme_is_used() {
        let auth = HeaderAuth::new("Token", Arc::new(StaticToken::new("xyz")));
        let mut req = request();
        auth.authorize(&mut req).await.unwrap();
        assert_eq!(req.headers()[AUTHORIZATION], "Token xyz");
    }

    #[tokio::test]
    async fn absent_parameter_skips_header() {
        let auth = HeaderAuth::bearer(Arc::new(Absent));
        let mut req = request();
        auth.authorize(&mut req).await.unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());

        let auth = HeaderAuth::bearer(Arc::new(StaticToken::new("")));
        auth.authorize(&mut req).await.unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn invalid_header_value_is_not_fatal() {
        let auth = HeaderAuth::bearer(Arc::new(StaticToken::new("bad\nvalue")));
        let mut req = request();
        auth.authorize(&mut req).await.unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }
}
