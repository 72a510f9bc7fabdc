//! Durable key/value storage behind the session store.
//!
//! The session persists exactly two keys (`auth_token`, `user_data`). Writes
//! of several entries land together or not at all, so a crash between them
//! cannot leave half a session on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

/// Storage file name in the cache directory
const STORAGE_FILE: &str = "storage.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage contents are corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Key/value persistence used by [`Session`](super::Session).
pub trait SessionStorage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store all entries in one atomic update.
    fn write(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove all keys in one atomic update. Missing keys are not an error.
    fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;
}

type Entries = BTreeMap<String, String>;

// ============================================================================
// File storage
// ============================================================================

/// JSON key/value file, replaced atomically on every update.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Storage file inside `dir` (created on first write).
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(STORAGE_FILE))
    }

    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Entries, StorageError> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn store(&self, entries: &Entries) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = entries.len(), "Storage file written");
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn write(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut current = self.load().unwrap_or_default();
        for (key, value) in entries {
            current.insert((*key).to_string(), (*value).to_string());
        }
        self.store(&current)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        if !self.path.exists() {
            return Ok(());
        }
        let mut current = self.load().unwrap_or_default();
        let before = current.len();
        current.retain(|k, _| !keys.contains(&k.as_str()));
        if current.len() == before && before > 0 {
            return Ok(());
        }
        if current.is_empty() {
            std::fs::remove_file(&self.path)?;
            return Ok(());
        }
        self.store(&current)
    }
}

// ============================================================================
// Memory storage
// ============================================================================

/// In-process storage for tests and ephemeral sessions. Writes can be
/// switched off to simulate a full or disabled store.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<Entries>,
    read_only: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing entries, e.g. a session left by a previous run.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let storage = Self::new();
        {
            let mut map = storage.entries.lock();
            for (k, v) in entries {
                map.insert(k.to_string(), v.to_string());
            }
        }
        storage
    }

    /// Make every subsequent write and remove fail.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.lock().clone()
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("storage is read-only".to_string()))
        } else {
            Ok(())
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut map = self.entries.lock();
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut map = self.entries.lock();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}
