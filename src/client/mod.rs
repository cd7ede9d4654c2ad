//! HTTP client that authorizes requests and dispatches responses by status code.

pub mod interceptor;
pub mod response;

pub use interceptor::AppDetails;
pub use response::{ResourceResponse, UnsuccessfulResponse};

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{AuthProvider, NoAuth};
use crate::config::ClientConfig;
use crate::error::{ApiError, ProblemDetails, Result};
use crate::patch::{MergePatch, PatchDocument};

pub const MEDIA_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const MEDIA_TYPE_TEXT_JSON: &str = "text/json";
pub const MEDIA_TYPE_JSON_PATCH: &str = "application/json-patch+json";
pub const MEDIA_TYPE_MERGE_PATCH: &str = "application/merge-patch+json";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Build a reqwest client with the crate's defaults.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .build()?)
}

/// Client for a JSON HTTP API.
///
/// Every request passes through the configured [`AuthProvider`] before it is
/// sent. Transport failures are returned as errors; anything the server
/// answers with becomes a [`ResourceResponse`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use apikit::auth::{HeaderAuth, StaticToken};
/// use apikit::client::ApiClient;
///
/// # async fn example() -> apikit::error::Result<()> {
/// let client = ApiClient::new(Arc::new(HeaderAuth::bearer(Arc::new(StaticToken::new("key")))))
///     .with_base_url("https://api.example.com/v1/")?;
/// let response = client.get::<serde_json::Value>("accounts/42").await?;
/// if response.is_unauthorized() {
///     println!("check credentials");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Option<Url>,
    auth: Arc<dyn AuthProvider>,
    app_details: Option<AppDetails>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("app_details", &self.app_details)
            .finish_non_exhaustive()
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(Arc::new(NoAuth))
    }
}

impl ApiClient {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: None,
            auth,
            app_details: None,
        }
    }

    /// Build a client from layered configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let timeout = config
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        let mut client = Self::new(config.auth_provider()?).with_http_client(build_http_client(timeout)?);
        if let Some(base_url) = &config.base_url {
            client = client.with_base_url(base_url)?;
        }
        if let Some(details) = &config.app_details {
            client = client.with_app_details(details.clone());
        }
        Ok(client)
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| ApiError::Configuration(format!("invalid base URL {base_url:?}: {e}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn with_app_details(mut self, details: AppDetails) -> Self {
        self.app_details = Some(details);
        self
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }
        let base = self.base_url.as_ref().ok_or_else(|| {
            ApiError::InvalidArgument(format!("relative path {path:?} used without a base URL"))
        })?;
        base.join(path)
            .map_err(|e| ApiError::InvalidArgument(format!("cannot resolve {path:?}: {e}")))
    }

    /// Start a request that [`Self::execute`] can later send.
    pub fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        Ok(self.http.request(method, self.url(path)?))
    }

    /// Send a request and dispatch the response, using [`ProblemDetails`] for 400s.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::Request,
    ) -> Result<ResourceResponse<T>> {
        self.execute_with_error::<T, ProblemDetails>(request).await
    }

    /// Send a request and dispatch the response with a custom error model.
    pub async fn execute_with_error<T, E>(
        &self,
        mut request: reqwest::Request,
    ) -> Result<ResourceResponse<T, E>>
    where
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        if let Some(details) = &self.app_details {
            details.apply(request.headers_mut());
        }
        self.auth.authorize(&mut request).await?;

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(%method, %url, "Sending request");

        let response = self.http.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        tracing::debug!(%method, %url, status = status.as_u16(), body_len = body.len(), "Received response");

        Ok(dispatch(status, headers, &body))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ResourceResponse<T>> {
        let request = self.request(Method::GET, path)?.build()?;
        self.execute(request).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<ResourceResponse<T>> {
        let request = self.request(Method::DELETE, path)?.build()?;
        self.execute(request).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<ResourceResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body, MEDIA_TYPE_JSON).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<ResourceResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, body, MEDIA_TYPE_JSON).await
    }

    /// PATCH with a JSON Patch document.
    pub async fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        document: &PatchDocument,
    ) -> Result<ResourceResponse<T>> {
        self.send_json(Method::PATCH, path, document, MEDIA_TYPE_JSON_PATCH)
            .await
    }

    /// PATCH with a JSON Merge Patch body.
    pub async fn merge_patch<T: DeserializeOwned>(
        &self,
        path: &str,
        patch: &MergePatch,
    ) -> Result<ResourceResponse<T>> {
        self.send_json(Method::PATCH, path, patch, MEDIA_TYPE_MERGE_PATCH)
            .await
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        content_type: &'static str,
    ) -> Result<ResourceResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        let request = self
            .request(method, path)?
            .header(CONTENT_TYPE, HeaderValue::from_static(content_type))
            .body(payload)
            .build()?;
        self.execute(request).await
    }
}

/// Map a raw response onto [`ResourceResponse`].
///
/// Bodies that fail to deserialize are logged and left unset.
pub fn dispatch<T, E>(status: StatusCode, headers: HeaderMap, body: &[u8]) -> ResourceResponse<T, E>
where
    T: DeserializeOwned,
    E: DeserializeOwned,
{
    let mut resource = None;
    let mut error = None;

    match status.as_u16() {
        200 | 201 | 204 => {
            if has_json_content_type(&headers) && !body.is_empty() {
                resource = decode(body, status, "resource");
            }
        }
        400 => {
            if !body.is_empty() {
                error = decode(body, status, "problem");
            }
        }
        _ => {}
    }

    ResourceResponse {
        status,
        headers,
        resource,
        error,
    }
}

fn decode<V: DeserializeOwned>(body: &[u8], status: StatusCode, what: &'static str) -> Option<V> {
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(status = status.as_u16(), error = %err, "Failed to deserialize {what} body");
            None
        }
    }
}

/// Whether the content-type subtype mentions `json` (`application/json`,
/// `text/json`, `application/problem+json`, ...).
pub fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .and_then(|essence| essence.split_once('/'))
        .map(|(_, subtype)| subtype.to_ascii_lowercase().contains("json"))
        .unwrap_or(false)
}
