//! apikit: authenticated REST client toolkit
//!
//! Pluggable `Authorization` header strategies (OAuth client credentials,
//! federated identity tokens, shared-key request signing), a token cache
//! with pluggable storage, JSON Patch and Merge Patch builders, and
//! RFC 7807 problem-details decoding.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use apikit::prelude::*;
//!
//! # async fn example() -> apikit::error::Result<()> {
//! let request = OAuthRequest::builder()
//!     .endpoint("https://login.example.com/oauth2/token")
//!     .client_id("my-app")
//!     .client_secret("s3cret")
//!     .resource("https://api.example.com")
//!     .build();
//! let credentials = ClientCredentialsProvider::new(request, TokenCache::in_memory());
//! let client = ApiClient::new(Arc::new(HeaderAuth::bearer(Arc::new(credentials))))
//!     .with_base_url("https://api.example.com/v1/")?;
//!
//! let patch = PatchDocument::new().replace("/name", "Ada");
//! let response = client.patch_json::<serde_json::Value>("accounts/42", &patch).await?;
//! if let Some(problem) = &response.error {
//!     eprintln!("{problem}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod patch;
pub mod prelude;
pub mod util;
