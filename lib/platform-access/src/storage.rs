//! Key-value storage backing the persisted session snapshot.
//!
//! The session store only needs string keys and string values, the same
//! contract as the browser's `localStorage`. Native builds use a single JSON
//! file, tests use memory.

use lonquiexpress_core::Result;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::warn;

use crate::error::StorageError;

/// Synchronous string key-value store.
pub trait KeyValueStorage: Send + Sync {
    /// Reads a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a key. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Writes several keys as one unit.
    ///
    /// Backends that cannot write atomically fall back to this default, which
    /// writes in order and restores the previous values of the keys already
    /// written when a later write fails.
    ///
    /// # Errors
    ///
    /// Returns the error of the failed write.
    fn write_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut written: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());
        for &(key, value) in entries {
            let previous = self.get(key)?;
            if let Err(err) = self.set(key, value) {
                for (key, previous) in written.into_iter().rev() {
                    let restored = match previous {
                        Some(previous) => self.set(key, &previous),
                        None => self.remove(key),
                    };
                    if let Err(rollback) = restored {
                        warn!(key, error = %rollback, "failed to roll back partial write");
                    }
                }
                return Err(err);
            }
            written.push((key, previous));
        }
        Ok(())
    }

    /// Removes several keys.
    ///
    /// Every key is attempted even if an earlier removal fails.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut first_error = None;
        for key in keys {
            if let Err(err) = self.remove(key) {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-process storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn write_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut stored = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            stored.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }
}

/// Storage kept in one JSON object file.
///
/// Every mutation rewrites the whole file through a sibling temp file and a
/// rename, so a crash leaves either the old or the new snapshot on disk.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Creates a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(err) => {
                return Err(StorageError::ReadFailed {
                    key: self.path.display().to_string(),
                    reason: err.to_string(),
                }
                .into());
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::Corrupt {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_failed = |reason: String| StorageError::WriteFailed {
            key: self.path.display().to_string(),
            reason,
        };

        let json = serde_json::to_vec_pretty(entries).map_err(|e| write_failed(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp).map_err(|e| write_failed(e.to_string()))?;
        file.write_all(&json)
            .and_then(|()| file.sync_all())
            .map_err(|e| write_failed(e.to_string()))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|e| write_failed(e.to_string()))?;
        Ok(())
    }

    fn mutate(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(err) => {
                // A corrupt file only ever holds session data; start over.
                warn!(path = %self.path.display(), error = %err, "replacing unreadable storage file");
                BTreeMap::new()
            }
        };
        f(&mut entries);
        self.persist(&entries)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn write_all(&self, pairs: &[(&str, &str)]) -> Result<(), StorageError> {
        self.mutate(|entries| {
            for (key, value) in pairs {
                entries.insert((*key).to_string(), (*value).to_string());
            }
        })
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.mutate(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        })
    }
}

/// The browser's `window.localStorage`.
///
/// The handle is looked up on every call so the type stays `Send + Sync`.
#[cfg(feature = "web")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserStorage;

#[cfg(feature = "web")]
impl BrowserStorage {
    fn handle() -> Result<web_sys::Storage, StorageError> {
        let window = web_sys::window().ok_or_else(|| StorageError::Unavailable {
            reason: "no window".to_string(),
        })?;
        match window.local_storage() {
            Ok(Some(storage)) => Ok(storage),
            Ok(None) => Err(StorageError::Unavailable {
                reason: "localStorage is disabled".to_string(),
            }
            .into()),
            Err(err) => Err(StorageError::Unavailable {
                reason: format!("{err:?}"),
            }
            .into()),
        }
    }
}

#[cfg(feature = "web")]
impl KeyValueStorage for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::handle()?.get_item(key).map_err(|err| {
            StorageError::ReadFailed {
                key: key.to_string(),
                reason: format!("{err:?}"),
            }
            .into()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::handle()?.set_item(key, value).map_err(|err| {
            StorageError::WriteFailed {
                key: key.to_string(),
                reason: format!("{err:?}"),
            }
            .into()
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::handle()?.remove_item(key).map_err(|err| {
            StorageError::WriteFailed {
                key: key.to_string(),
                reason: format!("{err:?}"),
            }
            .into()
        })
    }
}
