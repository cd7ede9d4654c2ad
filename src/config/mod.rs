//! Configuration system (layered: code > env > TOML file).

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::{
    AuthProvider, ClientCredentialsProvider, FileTokenStorage, HeaderAuth, NoAuth, OAuthRequest,
    SharedKeySigner, StaticToken, TokenCache,
};
use crate::client::AppDetails;
use crate::error::{ApiError, Result};

/// Shared-key signing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedKeyConfig {
    /// Base64-encoded signing key.
    pub key: String,
    pub date_header: Option<String>,
    pub scheme: Option<String>,
}

/// Layered configuration for an [`crate::client::ApiClient`].
///
/// Resolution order, highest first:
/// 1. Values set in code
/// 2. `APIKIT_*` environment variables (a `.env` file is loaded if present)
/// 3. A TOML file
///
/// Authentication is chosen from whichever credentials are present, in this
/// order: shared key, OAuth client credentials, static API key, none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub api_key: Option<String>,
    pub oauth: Option<OAuthRequest>,
    pub shared_key: Option<SharedKeyConfig>,
    pub app_details: Option<AppDetails>,
    /// Persist OAuth tokens in this file-backed slot instead of memory.
    pub token_cache_slot: Option<String>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (env-style keys).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let oauth = var("APIKIT_OAUTH_ENDPOINT").map(|endpoint| OAuthRequest {
            endpoint: Some(endpoint),
            client_id: var("APIKIT_OAUTH_CLIENT_ID"),
            client_secret: var("APIKIT_OAUTH_CLIENT_SECRET"),
            resource: var("APIKIT_OAUTH_RESOURCE"),
        });

        let shared_key = var("APIKIT_SHARED_KEY").map(|key| SharedKeyConfig {
            key,
            date_header: var("APIKIT_SHARED_KEY_DATE_HEADER"),
            scheme: var("APIKIT_SHARED_KEY_SCHEME"),
        });

        let app_details = match (var("APIKIT_APP_PACKAGE_ID"), var("APIKIT_APP_VERSION_NAME")) {
            (Some(package_id), Some(version_name)) => Some(AppDetails {
                package_id,
                version_name,
                version_code: var("APIKIT_APP_VERSION_CODE")
                    .and_then(|code| code.trim().parse().ok())
                    .unwrap_or(0),
            }),
            _ => None,
        };

        Self {
            base_url: var("APIKIT_BASE_URL"),
            timeout_secs: var("APIKIT_TIMEOUT_SECS").and_then(|secs| secs.trim().parse().ok()),
            api_key: var("APIKIT_API_KEY"),
            oauth,
            shared_key,
            app_details,
            token_cache_slot: var("APIKIT_TOKEN_CACHE_SLOT"),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| ApiError::Configuration(format!("invalid config: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// File (if given) overlaid with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(file.overlay(Self::from_env()))
    }

    /// Fields set in `higher` win; everything else is kept from `self`.
    pub fn overlay(self, higher: ClientConfig) -> Self {
        Self {
            base_url: higher.base_url.or(self.base_url),
            timeout_secs: higher.timeout_secs.or(self.timeout_secs),
            api_key: higher.api_key.or(self.api_key),
            oauth: match (self.oauth, higher.oauth) {
                (Some(low), Some(high)) => Some(OAuthRequest {
                    endpoint: high.endpoint.or(low.endpoint),
                    client_id: high.client_id.or(low.client_id),
                    client_secret: high.client_secret.or(low.client_secret),
                    resource: high.resource.or(low.resource),
                }),
                (low, high) => high.or(low),
            },
            shared_key: higher.shared_key.or(self.shared_key),
            app_details: higher.app_details.or(self.app_details),
            token_cache_slot: higher.token_cache_slot.or(self.token_cache_slot),
        }
    }

    /// Authentication strategy implied by the configured credentials.
    pub fn auth_provider(&self) -> Result<Arc<dyn AuthProvider>> {
        if let Some(shared) = &self.shared_key {
            let mut signer = SharedKeySigner::from_base64(&shared.key)?;
            if let Some(header) = &shared.date_header {
                signer = signer.with_date_header(header)?;
            }
            let auth = match &shared.scheme {
                Some(scheme) => HeaderAuth::new(scheme.clone(), Arc::new(signer)),
                None => HeaderAuth::shared_key(signer),
            };
            return Ok(Arc::new(auth));
        }

        if let Some(oauth) = &self.oauth {
            let cache = match &self.token_cache_slot {
                Some(slot) => TokenCache::new(Arc::new(FileTokenStorage::new_default(slot))),
                None => TokenCache::in_memory(),
            };
            let provider = ClientCredentialsProvider::new(oauth.clone(), cache);
            return Ok(Arc::new(HeaderAuth::bearer(Arc::new(provider))));
        }

        if let Some(key) = &self.api_key {
            return Ok(Arc::new(HeaderAuth::bearer(Arc::new(StaticToken::new(key.clone())))));
        }

        Ok(Arc::new(NoAuth))
    }
}
