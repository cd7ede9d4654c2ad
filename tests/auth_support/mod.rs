#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use apikit::auth::{
    AuthError, ClientCredentialsForm, IdentityPlatform, OAuthRequest, TokenRequester,
    TokenResponse,
};
use apikit::util::retry::RetryPolicy;
use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub fn oauth_request(endpoint: &str) -> OAuthRequest {
    OAuthRequest::builder()
        .endpoint(endpoint)
        .client_id("client-1")
        .client_secret("secret-1")
        .resource("https://api.example.com")
        .build()
}

/// Retry policy without sleeps, for tests that hit a real socket.
pub fn no_backoff() -> RetryPolicy {
    RetryPolicy {
        initial_backoff: Duration::ZERO,
        max_jitter: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

pub fn issued(access_token: &str, expires_in: i64) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        expires_in,
        expires_on: 3600,
    }
}

pub fn transient() -> AuthError {
    AuthError::Network("connection reset".to_string())
}

/// Token requester that replays a fixed script of outcomes.
#[derive(Default)]
pub struct ScriptedRequester {
    script: Mutex<VecDeque<Result<TokenResponse, AuthError>>>,
    calls: Mutex<Vec<Instant>>,
    cancel_on_call: Option<CancellationToken>,
}

impl ScriptedRequester {
    pub fn new(script: Vec<Result<TokenResponse, AuthError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Cancel `token` as soon as a request is made.
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_call = Some(token);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("requester lock poisoned").len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().expect("requester lock poisoned").clone()
    }
}

#[async_trait]
impl TokenRequester for ScriptedRequester {
    async fn request_token(&self, _form: &ClientCredentialsForm) -> Result<TokenResponse, AuthError> {
        self.calls
            .lock()
            .expect("requester lock poisoned")
            .push(Instant::now());
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }
        self.script
            .lock()
            .expect("requester lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::InvalidResponse("script exhausted".to_string())))
    }
}

/// Identity platform with a canned signed-in state and token script.
pub struct FakePlatform {
    signed_in: bool,
    script: Mutex<VecDeque<Result<Option<String>, AuthError>>>,
    calls: AtomicUsize,
}

impl FakePlatform {
    pub fn signed_in(script: Vec<Result<Option<String>, AuthError>>) -> Self {
        Self {
            signed_in: true,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            signed_in: false,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityPlatform for FakePlatform {
    fn has_current_user(&self) -> bool {
        self.signed_in
    }

    async fn id_token(&self, force_refresh: bool) -> Result<Option<String>, AuthError> {
        assert!(!force_refresh, "tokens are never force-refreshed");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("platform lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::Identity("script exhausted".to_string())))
    }
}
