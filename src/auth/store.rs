use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::token::CachedToken;

/// Persistence capability for a single cached bearer token.
///
/// Implementations must replace the value and its expiry together: a reader
/// never sees a new value paired with an old expiry.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Result<Option<CachedToken>, AuthError>;
    fn save(&self, token: &CachedToken) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

/// Process-local storage, mostly for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    slot: Mutex<Option<CachedToken>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<CachedToken>, AuthError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| AuthError::Io("token storage lock poisoned".to_string()))?;
        Ok(slot.clone())
    }

    fn save(&self, token: &CachedToken) -> Result<(), AuthError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| AuthError::Io("token storage lock poisoned".to_string()))?;
        *slot = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| AuthError::Io("token storage lock poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStorageConfig {
    pub base_dir: PathBuf,
    pub slot: String,
}

impl TokenStorageConfig {
    pub fn new(base_dir: PathBuf, slot: impl Into<String>) -> Self {
        Self {
            base_dir,
            slot: slot.into(),
        }
    }

    pub fn default_dir() -> PathBuf {
        default_apikit_dir()
    }
}

/// File-backed token storage using one TOML file per slot.
///
/// Writes go to a temporary sibling and are renamed into place, so the
/// value/expiry pair is swapped in one step.
///
/// # Example
/// ```no_run
/// use apikit::auth::{CachedToken, FileTokenStorage, TokenStorage, TokenStorageConfig};
///
/// let storage = FileTokenStorage::new(TokenStorageConfig::new(
///     std::path::PathBuf::from("/tmp/apikit"),
///     "payments",
/// ));
/// storage.save(&CachedToken::issued_at("access", 3600, chrono::Utc::now()))?;
/// # Ok::<(), apikit::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    base_dir: PathBuf,
    slot: String,
}

impl FileTokenStorage {
    pub fn new(config: TokenStorageConfig) -> Self {
        Self {
            base_dir: config.base_dir,
            slot: normalize_label(&config.slot),
        }
    }

    pub fn new_default(slot: &str) -> Self {
        Self {
            base_dir: default_apikit_dir(),
            slot: normalize_label(slot),
        }
    }

    fn token_path(&self) -> PathBuf {
        self.base_dir.join(format!("{}.toml", self.slot))
    }

    fn ensure_parent(path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<CachedToken>, AuthError> {
        let path = self.token_path();
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let file: TokenFile = toml::from_str(&raw)?;
        Ok(Some(file.token))
    }

    fn save(&self, token: &CachedToken) -> Result<(), AuthError> {
        let path = self.token_path();
        Self::ensure_parent(&path)?;
        let file = TokenFile {
            version: 1,
            slot: self.slot.clone(),
            saved_at: Utc::now(),
            token: token.clone(),
        };
        let serialized = toml::to_string(&file)?;
        let staging = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&staging, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&staging, fs::Permissions::from_mode(0o600))?;
        }
        if let Err(err) = fs::rename(&staging, &path) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(self.token_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    slot: String,
    saved_at: DateTime<Utc>,
    token: CachedToken,
}

/// Expiry-aware view over a [`TokenStorage`].
///
/// Storage read failures are logged and treated as "nothing cached", which
/// sends the caller down the acquisition path.
#[derive(Clone)]
pub struct TokenCache {
    storage: Arc<dyn TokenStorage>,
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache").finish_non_exhaustive()
    }
}

impl TokenCache {
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStorage::new()))
    }

    pub fn get(&self) -> Option<CachedToken> {
        match self.storage.load() {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read cached token");
                None
            }
        }
    }

    /// Store `token`, valid for `lifetime_secs` from now minus the safety margin.
    pub fn set(&self, token: &str, lifetime_secs: i64) -> Result<(), AuthError> {
        self.set_at(token, lifetime_secs, Utc::now())
    }

    pub fn set_at(
        &self,
        token: &str,
        lifetime_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let entry = CachedToken::issued_at(token, lifetime_secs, now);
        tracing::debug!(
            token_len = token.len(),
            expires_at = %entry.expires_at,
            "Caching access token"
        );
        self.storage.save(&entry)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// An absent entry counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.get() {
            Some(token) => {
                tracing::trace!(%now, expires_at = %token.expires_at, "Comparing token expiry");
                token.is_expired_at(now)
            }
            None => true,
        }
    }

    /// The cached value if present, non-empty and not due for refresh at `now`.
    pub fn valid_at(&self, now: DateTime<Utc>) -> Option<CachedToken> {
        self.get()
            .filter(|token| !token.value.is_empty() && !token.needs_refresh_at(now))
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        self.storage.clear()
    }
}

fn default_apikit_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".apikit"))
        .unwrap_or_else(|| PathBuf::from(".apikit"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
