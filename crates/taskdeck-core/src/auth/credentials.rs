//! Persistence of the bearer token and the signed-in user's profile.
//!
//! Both values are written and removed together. A backend that holds only
//! one of the two entries is reported as holding no credential at all.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use keyring::Entry;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::User;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "token";

/// Storage key for the JSON-serialized user profile
pub const USER_KEY: &str = "user";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Credential storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential data could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Refusing to store an empty token")]
    EmptyToken,
}

/// A string key/value medium.
///
/// `set_all` and `remove_all` act on every key in one call so that a backend
/// capable of atomic writes can expose them atomically.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StoreError>;

    fn remove_all(&self, keys: &[&str]) -> Result<(), StoreError>;
}

/// A complete stored credential. The token is redacted from `Debug` output.
#[derive(Debug)]
pub struct Credential {
    pub token: SecretString,
    pub user: User,
}

/// Credential persistence shared by the session controller and the gateway.
///
/// Every operation runs under one lock, so readers never interleave with a
/// half-finished `save` or `clear` from another task.
pub struct CredentialStore {
    backend: Mutex<Box<dyn Storage>>,
}

impl CredentialStore {
    pub fn new(backend: impl Storage + 'static) -> Self {
        Self {
            backend: Mutex::new(Box::new(backend)),
        }
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    fn backend(&self) -> MutexGuard<'_, Box<dyn Storage>> {
        // A panic while holding the lock cannot leave a partial write behind
        // (every backend writes all keys in one call), so the guard is reused.
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist the user profile and token together.
    ///
    /// A blank token is rejected: it would read back as no credential at all.
    pub fn save(&self, user: &User, token: &str) -> Result<(), StoreError> {
        if token.trim().is_empty() {
            return Err(StoreError::EmptyToken);
        }
        let user_json = serde_json::to_string(user)?;
        self.backend()
            .set_all(&[(TOKEN_KEY, token), (USER_KEY, &user_json)])?;
        debug!(user_id = user.id, "Credential saved");
        Ok(())
    }

    /// Load the stored credential.
    ///
    /// Returns `None` unless both entries are present and non-empty and the
    /// profile parses.
    pub fn load(&self) -> Result<Option<Credential>, StoreError> {
        let backend = self.backend();
        let token = backend.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        let user_json = backend.get(USER_KEY)?.filter(|u| !u.is_empty());
        drop(backend);

        let (token, user_json) = match (token, user_json) {
            (Some(token), Some(user_json)) => (token, user_json),
            (None, None) => return Ok(None),
            (token, user) => {
                debug!(
                    has_token = token.is_some(),
                    has_user = user.is_some(),
                    "Ignoring partial credential"
                );
                return Ok(None);
            }
        };

        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => Ok(Some(Credential {
                token: SecretString::from(token),
                user,
            })),
            Err(e) => {
                warn!(error = %e, "Stored user profile is unreadable");
                Ok(None)
            }
        }
    }

    /// Token of a complete credential, if any
    pub fn token(&self) -> Result<Option<SecretString>, StoreError> {
        Ok(self.load()?.map(|c| c.token))
    }

    /// Remove both entries. Safe to call any number of times.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend().remove_all(&[TOKEN_KEY, USER_KEY])?;
        debug!("Credential cleared");
        Ok(())
    }
}

// ============================================================================
// Backends
// ============================================================================

/// In-process storage, used for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut map = self.entries();
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut map = self.entries();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Entries kept in a single JSON document on disk.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a reader sees either the old document or the new one.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. An unparsable file reads as empty and is replaced
    /// by the next write.
    fn read_document(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&contents) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Credential file is corrupt; treating it as empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_document(&self, doc: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if doc.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(doc)?;
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_document()?.remove(key))
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut doc = self.read_document()?;
        for (key, value) in entries {
            doc.insert((*key).to_string(), (*value).to_string());
        }
        self.write_document(&doc)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut doc = self.read_document()?;
        let before = doc.len();
        for key in keys {
            doc.remove(*key);
        }
        if doc.len() == before && !self.path.exists() {
            return Ok(());
        }
        self.write_document(&doc)
    }
}

/// Entries kept in the OS keychain, one keychain item per key.
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, key)?)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Storage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        for (i, (key, value)) in entries.iter().enumerate() {
            let result = self.entry(key).and_then(|e| Ok(e.set_password(value)?));
            if let Err(e) = result {
                // Roll back what was already written so no half credential remains
                for (written, _) in entries.iter().take(i) {
                    if let Err(rollback) = self.delete(written) {
                        warn!(key = %written, error = %rollback, "Keychain rollback failed");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
