use std::collections::HashMap;
use std::sync::Mutex;

use zoek_core::error::ZoekError;

/// Environment variable checked before the credential store.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_PAT";

/// Key under which the GitHub token is kept in a [`CredentialStore`].
pub const GITHUB_TOKEN_KEY: &str = "github";

/// Trait for credential storage backends.
pub trait CredentialStore: Send + Sync {
    /// Store a token under the given key.
    fn store(&self, key: &str, token: &str) -> Result<(), ZoekError>;

    /// Retrieve a token by key.
    fn get(&self, key: &str) -> Result<Option<String>, ZoekError>;

    /// Delete a stored token.
    fn delete(&self, key: &str) -> Result<(), ZoekError>;
}

/// Resolve the GitHub API token: `$GITHUB_PAT` first, then the store.
pub fn resolve_github_token(store: &dyn CredentialStore) -> Result<String, ZoekError> {
    resolve_token(store, std::env::var(GITHUB_TOKEN_ENV).ok())
}

fn resolve_token(store: &dyn CredentialStore, from_env: Option<String>) -> Result<String, ZoekError> {
    if let Some(token) = from_env.filter(|t| !t.trim().is_empty()) {
        tracing::debug!("using GitHub token from ${GITHUB_TOKEN_ENV}");
        return Ok(token.trim().to_string());
    }
    store
        .get(GITHUB_TOKEN_KEY)?
        .ok_or_else(|| ZoekError::Credential {
            message: format!(
                "no GitHub token: set ${GITHUB_TOKEN_ENV} or run `zoek auth set`"
            ),
        })
}

/// OS keychain-backed credential store using the `keyring` crate.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: "zoek".to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, ZoekError> {
        keyring::Entry::new(&self.service, key).map_err(|e| ZoekError::Credential {
            message: e.to_string(),
        })
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn store(&self, key: &str, token: &str) -> Result<(), ZoekError> {
        self.entry(key)?
            .set_password(token)
            .map_err(|e| ZoekError::Credential {
                message: e.to_string(),
            })
    }

    fn get(&self, key: &str) -> Result<Option<String>, ZoekError> {
        match self.entry(key)?.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ZoekError::Credential {
                message: e.to_string(),
            }),
        }
    }

    fn delete(&self, key: &str) -> Result<(), ZoekError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ZoekError::Credential {
                message: e.to_string(),
            }),
        }
    }
}

/// In-process store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, ZoekError> {
        self.tokens.lock().map_err(|_| ZoekError::Credential {
            message: "memory store poisoned".into(),
        })
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, token: &str) -> Result<(), ZoekError> {
        self.lock()?.insert(key.to_string(), token.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, ZoekError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), ZoekError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert_eq!(store.get("test-key").unwrap(), None);
        store.store("test-key", "secret-token").unwrap();
        assert_eq!(store.get("test-key").unwrap(), Some("secret-token".to_string()));
        store.delete("test-key").unwrap();
        assert_eq!(store.get("test-key").unwrap(), None);
    }

    #[test]
    fn test_env_token_wins() {
        let store = MemoryStore::new();
        store.store(GITHUB_TOKEN_KEY, "from-store").unwrap();
        let token = resolve_token(&store, Some(" from-env\n".into())).unwrap();
        assert_eq!(token, "from-env");
    }

    #[test]
    fn test_blank_env_falls_back_to_store() {
        let store = MemoryStore::new();
        store.store(GITHUB_TOKEN_KEY, "from-store").unwrap();
        assert_eq!(resolve_token(&store, Some("  ".into())).unwrap(), "from-store");
    }

    #[test]
    fn test_missing_token_is_credential_error() {
        let store = MemoryStore::new();
        let err = resolve_token(&store, None).unwrap_err();
        assert!(matches!(err, ZoekError::Credential { .. }));
    }
}
