use chrono::{DateTime, Duration, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Seconds shaved off a server-declared lifetime so a token is refreshed
/// before the resource server would reject it.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 10;

/// Longest lifetime a cache entry is given, whatever the server declares.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Bearer token held by a [`super::TokenCache`].
///
/// `expires_at` already has the safety margin applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Build a cache entry for a token acquired at `acquired_at` that the
    /// server declared valid for `lifetime_secs`.
    ///
    /// The lifetime is clamped to ±[`MAX_TOKEN_LIFETIME_SECS`].
    pub fn issued_at(value: impl Into<String>, lifetime_secs: i64, acquired_at: DateTime<Utc>) -> Self {
        let lifetime = lifetime_secs.clamp(-MAX_TOKEN_LIFETIME_SECS, MAX_TOKEN_LIFETIME_SECS)
            - EXPIRY_SAFETY_MARGIN_SECS;
        let expires_at = acquired_at
            .checked_add_signed(Duration::seconds(lifetime))
            .unwrap_or(acquired_at);
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Past the expiry instant. At exactly `expires_at` the token still counts
    /// as unexpired, but [`Self::needs_refresh_at`] is already true.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether a caller about to use the token should fetch a new one.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Success body of a client-credentials token endpoint.
///
/// `expires_in` and `expires_on` may arrive as numbers or as numeric strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, deserialize_with = "seconds")]
    pub expires_in: i64,
    #[serde(default = "default_expires_on", deserialize_with = "seconds")]
    pub expires_on: i64,
}

fn default_expires_on() -> i64 {
    3600
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    Text(String),
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| de::Error::custom(format!("invalid seconds value {text:?}: {e}"))),
    }
}
