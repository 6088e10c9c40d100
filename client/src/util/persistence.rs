//! Key/value storage for the persisted session copy.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session survives restarts as two entries: the credential under
//! `token` and the serialized identity under `user`. `SessionStorage` is the
//! `localStorage`-shaped seam; `MemoryStorage` backs tests and ephemeral
//! runs, `FileStorage` backs the terminal client.
//!
//! TRADE-OFFS
//! ==========
//! Both entries are written and cleared through the multi-key methods so an
//! implementation can make the pair atomic. `FileStorage` keeps every key in
//! one JSON object and replaces the file with write-then-rename.

#[cfg(test)]
#[path = "persistence_test.rs"]
mod persistence_test;

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::net::types::Identity;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session storage io failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session storage encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Client-local key/value storage.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Write every entry, or none of them.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be written.
    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove every key; absent keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be written.
    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError>;
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw entries, e.g. to simulate a corrupted persisted copy.
    #[must_use]
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let map = entries.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        Self { entries: Mutex::new(map) }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// All keys in one JSON object on disk.
///
/// An unreadable or corrupt file reads as empty; the next write replaces it.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> BTreeMap<String, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session file unreadable");
                return BTreeMap::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "session file corrupt; treating as empty");
            BTreeMap::new()
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source: io::Error| StorageError::Io { path: self.path.clone(), source };

        if map.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_err(e)),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let encoded = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        let written = write_private(&tmp, &encoded).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp session file");
                }
            }
            return Err(io_err(e));
        }
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.read_map().remove(key)
    }

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map();
        for (key, value) in entries {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        self.write_map(&map)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map();
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before && !self.path.exists() {
            return Ok(());
        }
        self.write_map(&map)
    }
}

fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    restrict_permissions(&file)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

// =============================================================================
// SESSION PAIR
// =============================================================================

/// What the storage currently holds for the session pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistedSession {
    /// Neither key present.
    Empty,
    /// Both keys present and decodable.
    Valid { token: String, identity: Identity },
    /// Torn or undecodable; the reason is for logs only.
    Invalid(String),
}

/// Read and validate the persisted token/identity pair.
#[must_use]
pub fn load_session(storage: &dyn SessionStorage) -> PersistedSession {
    let token = storage.get(TOKEN_KEY).filter(|t| !t.trim().is_empty());
    let user = storage.get(USER_KEY).filter(|u| !u.trim().is_empty());

    match (token, user) {
        (None, None) => PersistedSession::Empty,
        (Some(_), None) => PersistedSession::Invalid("token without user".to_owned()),
        (None, Some(_)) => PersistedSession::Invalid("user without token".to_owned()),
        (Some(token), Some(user)) => match serde_json::from_str::<Identity>(&user) {
            Ok(identity) => PersistedSession::Valid { token, identity },
            Err(e) => PersistedSession::Invalid(format!("user record: {e}")),
        },
    }
}

/// Write the token and identity together.
///
/// # Errors
///
/// Returns a [`StorageError`] if encoding or the write fails; nothing is
/// written in that case.
pub fn save_session(storage: &dyn SessionStorage, token: &str, identity: &Identity) -> Result<(), StorageError> {
    let user = serde_json::to_string(identity)?;
    storage.set_all(&[(TOKEN_KEY, token), (USER_KEY, user.as_str())])
}

/// Remove both session keys.
///
/// # Errors
///
/// Returns a [`StorageError`] if the backing store cannot be written.
pub fn clear_session(storage: &dyn SessionStorage) -> Result<(), StorageError> {
    storage.remove_all(&[TOKEN_KEY, USER_KEY])
}
