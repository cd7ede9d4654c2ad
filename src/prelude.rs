//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthError, AuthProvider, ClientCredentialsProvider, FederatedTokenProvider, HeaderAuth,
    IdentityPlatform, NoAuth, OAuthRequest, ParameterSource, SharedKeySigner, StaticToken,
    TokenCache, TokenStorage,
};
pub use crate::client::{ApiClient, AppDetails, ResourceResponse};
pub use crate::config::ClientConfig;
pub use crate::error::{ApiError, ProblemDetails, Result};
pub use crate::patch::{MergePatch, PatchDocument, PatchOperation};
pub use crate::util::retry::RetryPolicy;
