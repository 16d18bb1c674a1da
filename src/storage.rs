//! Durable credential persistence.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each identity domain persists its raw bearer token under its own key
//! (`userToken`, `companyToken`, `adminToken`). Reads happen once at
//! startup; writes happen synchronously on login and logout. `FileStore`
//! keeps all keys in one JSON object on disk; `MemoryStore` backs tests and
//! ephemeral sessions.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("credential store io failed at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("credential store at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("refusing to persist an empty token for {key}")]
    EmptyToken { key: String },
}

/// Key/value persistence for bearer tokens.
pub trait CredentialStore: Send + Sync {
    /// Read the token stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Persist `token` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the write fails.
    fn save(&self, key: &str, token: &str) -> Result<(), StorageError>;

    /// Delete the entry for `key`. Missing entries are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn reject_empty(key: &str, token: &str) -> Result<(), StorageError> {
    if token.trim().is_empty() {
        return Err(StorageError::EmptyToken { key: key.to_owned() });
    }
    Ok(())
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON-file credential store.
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io { path: self.path.clone(), source }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt { path: self.path.clone(), reason: e.to_string() })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Corrupt { path: self.path.clone(), reason: e.to_string() })?;
        std::fs::write(&self.path, raw).map_err(|e| self.io_error(e))
    }
}

impl CredentialStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, token: &str) -> Result<(), StorageError> {
        reject_empty(key, token)?;
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all()?;
        entries.insert(key.to_owned(), token.to_owned());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process credential store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, e.g. to simulate a restart with saved tokens.
    #[must_use]
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Self { entries: Mutex::new(entries) }
    }

    /// Current value for `key` without going through the trait.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, token: &str) -> Result<(), StorageError> {
        reject_empty(key, token)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), token.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
