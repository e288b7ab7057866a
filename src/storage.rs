//! Durable key/value persistence.
//!
//! [`Storage`] is the gateway the rest of the crate talks to. It serializes
//! values as JSON and never fails outward: a write that cannot be completed
//! is logged and reported as `false`, and a read that cannot be completed
//! (missing key, corrupt data, unavailable backend) yields the caller's
//! default. Every write is a full overwrite of the key.
//!
//! Backends implement [`StorageBackend`]: [`FileStorage`] keeps one JSON file
//! per key in a directory, [`MemoryStorage`] keeps values in process and can
//! simulate a disabled or full store.

use crate::error::StorageError;
use log::{debug, error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Well-known storage keys.
pub mod keys {
    /// The full record collection snapshot.
    pub const RECORDS: &str = "cars_characters";

    /// The theme preference token.
    pub const THEME: &str = "cars_theme_preference";
}

/// Raw string key/value storage.
pub trait StorageBackend {
    /// Read the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One JSON file per key, written atomically.
///
/// Values are written to `<key>.json.tmp`, synced, then renamed over
/// `<key>.json`, so a crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(FileStorage { dir })
    }

    /// Returns the storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp_path = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path).map_err(io_err(&tmp_path))?;
        file.write_all(value.as_bytes()).map_err(io_err(&tmp_path))?;
        file.sync_data().map_err(io_err(&tmp_path))?;
        drop(file);

        fs::rename(&tmp_path, &path).map_err(io_err(&path))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        for target in [path.clone(), path.with_extension("json.tmp")] {
            match fs::remove_file(&target) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(&target)(e)),
            }
        }
        Ok(())
    }
}

/// In-process storage.
///
/// Useful for tests and for sessions where durable storage is disabled.
/// [`set_available`](Self::set_available) and
/// [`set_quota`](Self::set_quota) simulate a disabled or full store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
    unavailable: Cell<bool>,
    quota: Cell<Option<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// When `false`, every operation fails with
    /// [`StorageError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.unavailable.set(!available);
    }

    /// Limit the total stored bytes. Writes that would exceed it fail with
    /// [`StorageError::QuotaExceeded`].
    pub fn set_quota(&self, bytes: Option<usize>) {
        self.quota.set(bytes);
    }

    /// Store a raw value, bypassing availability and quota checks.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.get() {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        if let Some(quota) = self.quota.get() {
            let entries = self.entries.borrow();
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    size: value.len(),
                });
            }
        }
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Best-effort JSON gateway over a [`StorageBackend`].
///
/// Cloning is cheap and shares the backend.
///
/// # Examples
///
/// ```
/// use paddock::Storage;
///
/// let storage = Storage::in_memory();
/// assert!(storage.save("numbers", &vec![1, 2, 3]));
/// let numbers: Vec<u32> = storage.load("numbers", Vec::new());
/// assert_eq!(numbers, vec![1, 2, 3]);
///
/// let missing: Vec<u32> = storage.load("absent", vec![42]);
/// assert_eq!(missing, vec![42]);
/// ```
#[derive(Clone)]
pub struct Storage {
    backend: Rc<dyn StorageBackend>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Storage {
            backend: Rc::new(backend),
        }
    }

    /// Share an existing backend handle (e.g. a [`MemoryStorage`] a test
    /// wants to keep poking at).
    pub fn from_rc(backend: Rc<dyn StorageBackend>) -> Self {
        Storage { backend }
    }

    /// A fresh [`MemoryStorage`]-backed gateway.
    pub fn in_memory() -> Self {
        Storage::new(MemoryStorage::new())
    }

    /// A [`FileStorage`]-backed gateway rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Storage::new(FileStorage::open(dir)?))
    }

    /// Serialize `value` and write it under `key`.
    ///
    /// Returns `false` (after logging) if encoding or writing failed.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(()) => true,
            Err(e) => {
                error!("paddock: failed to save {key:?}: {e}");
                false
            }
        }
    }

    /// Like [`save`](Self::save) but reports the failure.
    pub fn try_save<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, &json)?;
        debug!("paddock: saved {key:?} ({} bytes)", json.len());
        Ok(())
    }

    /// Read and deserialize `key`, or return `default` if it is absent,
    /// unreadable or corrupt.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                warn!("paddock: failed to load {key:?}, using default: {e}");
                default
            }
        }
    }

    /// Like [`load`](Self::load) but reports failures and absence.
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(json) = self.backend.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| StorageError::Decode {
                key: key.to_string(),
                source,
            })
    }

    /// Write a raw string, without JSON encoding.
    pub fn save_raw(&self, key: &str, value: &str) -> bool {
        match self.backend.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                error!("paddock: failed to save {key:?}: {e}");
                false
            }
        }
    }

    /// Read a raw string, or `None` if absent or unreadable.
    pub fn load_raw(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("paddock: failed to load {key:?}: {e}");
                None
            }
        }
    }

    /// Delete `key`. Returns `false` (after logging) on failure.
    pub fn remove(&self, key: &str) -> bool {
        match self.backend.remove(key) {
            Ok(()) => true,
            Err(e) => {
                error!("paddock: failed to remove {key:?}: {e}");
                false
            }
        }
    }

    /// True if a value is stored under `key`.
    pub fn exists(&self, key: &str) -> bool {
        matches!(self.backend.get(key), Ok(Some(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_keys_are_restricted() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(storage.path_for("cars_characters").is_ok());
        assert!(matches!(
            storage.path_for("../escape"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.path_for("").is_err());
    }

    #[test]
    fn memory_quota_counts_other_keys() {
        let storage = MemoryStorage::new();
        storage.set_quota(Some(20));
        storage.set("a", "0123456789").unwrap();
        assert!(matches!(
            storage.set("b", "0123456789"),
            Err(StorageError::QuotaExceeded { .. })
        ));
        // overwriting the same key only counts the new value
        storage.set("a", "01234567890123").unwrap();
    }

    #[test]
    fn unavailable_memory_storage_fails_every_call() {
        let storage = MemoryStorage::new();
        storage.set_available(false);
        assert!(matches!(storage.get("k"), Err(StorageError::Unavailable)));
        assert!(matches!(storage.set("k", "v"), Err(StorageError::Unavailable)));
        assert!(matches!(storage.remove("k"), Err(StorageError::Unavailable)));
    }
}
