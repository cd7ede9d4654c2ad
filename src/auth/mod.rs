//! Request authentication: token caching, credential providers and header strategies.

pub mod error;
pub mod federated;
pub mod oauth;
pub mod provider;
pub mod shared_key;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use federated::{FederatedTokenProvider, IdentityPlatform};
pub use oauth::{
    ClientCredentialsForm, ClientCredentialsProvider, HttpTokenRequester, OAuthRequest,
    TokenRequester,
};
pub use provider::{AuthProvider, HeaderAuth, NoAuth, ParameterSource, StaticToken};
pub use shared_key::SharedKeySigner;
pub use store::{
    FileTokenStorage, MemoryTokenStorage, TokenCache, TokenStorage, TokenStorageConfig,
};
pub use token::{CachedToken, TokenResponse};
