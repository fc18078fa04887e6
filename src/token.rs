//! Bearer token storage and the session gate that guards authenticated calls.
//!
//! Token issuance (login, registration) happens elsewhere; this module only
//! stores whatever token it is handed and refuses to proceed without one.

use std::fmt;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{LensError, Result};

/// Opaque bearer credential. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into().trim().to_string();
        if raw.is_empty() {
            return Err(LensError::validation("token must not be empty"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Capability over wherever the session token lives.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Result<Option<AccessToken>>;
    fn set(&self, token: AccessToken) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<AccessToken>> {
        let guard = self.token.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    fn set(&self, token: AccessToken) -> Result<()> {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        Ok(())
    }
}

/// Token persisted as a single trimmed line in a file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/transparency-lens/token`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("transparency-lens").join("token"))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<AccessToken>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(AccessToken::new(content).ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, token: AccessToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, format!("{}\n", token.as_str()))?;
        tracing::debug!("token written to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Authorization precondition for calls that carry a bearer token.
pub struct SessionGate;

impl SessionGate {
    /// Returns the stored token or fails with `Unauthorized` before any request.
    pub fn authorize(store: &dyn TokenStore) -> Result<AccessToken> {
        store.get()?.ok_or_else(|| LensError::Unauthorized {
            message: "Please log in first.".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_rejects_missing_token() {
        let store = MemoryTokenStore::new();
        assert!(matches!(
            SessionGate::authorize(&store),
            Err(LensError::Unauthorized { .. })
        ));
        store.set(AccessToken::new("abc").unwrap()).unwrap();
        assert_eq!(SessionGate::authorize(&store).unwrap().as_str(), "abc");
        store.clear().unwrap();
        assert!(store.get().unwrap().is_none());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AccessToken::new("secret-value").unwrap();
        assert!(!format!("{:?}", token).contains("secret"));
    }

    #[test]
    fn blank_token_is_rejected() {
        assert!(AccessToken::new("  \n").is_err());
    }

    #[test]
    fn file_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));
        assert!(store.get().unwrap().is_none());

        store.set(AccessToken::new("tok-1").unwrap()).unwrap();
        assert_eq!(store.get().unwrap().unwrap().as_str(), "tok-1");

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.get().unwrap().is_none());
    }
}
