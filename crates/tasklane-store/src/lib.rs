//! Persistent key-value storage for tasklane.
//!
//! Values are opaque strings addressed by string keys. [`FileStore`] keeps one file
//! per key inside a data directory; [`MemoryStore`] keeps everything in process.

mod error;

pub use error::StoreError;

use lru::LruCache;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::debug;

const VALUE_CACHE_CAPACITY: usize = 32;
const VALUE_FILE_EXTENSION: &str = "json";

/// Minimal get/set/remove contract over string keys and values.
pub trait KeyValueStore {
    /// Error type bubbled up from the backing store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    /// Returns a store-specific error when the value cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns a store-specific error when the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Remove the value under `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns a store-specific error when the value cannot be removed.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;

    /// Remove several keys, stopping at the first failure.
    ///
    /// # Errors
    /// Propagates the first error from [`remove`](Self::remove).
    fn remove_many(&self, keys: &[&str]) -> Result<(), Self::Error> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    type Error = S::Error;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        (**self).remove(key)
    }
}

/// Storage backed by one file per key under a data directory.
///
/// Writes go through a temporary file and an atomic rename so readers never observe
/// a half-written value. Recently read values are kept in a small LRU cache.
pub struct FileStore {
    root: PathBuf,
    value_cache: Mutex<LruCache<String, String>>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let capacity = NonZeroUsize::new(VALUE_CACHE_CAPACITY)
            .ok_or_else(|| StoreError::Other("cache capacity must be non-zero".into()))?;
        debug!(root = %root.display(), "Opened file store");
        Ok(Self {
            root,
            value_cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Directory holding the value files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(format!("{key}.{VALUE_FILE_EXTENSION}")))
    }

    fn cached_value(&self, key: &str) -> Option<String> {
        self.value_cache
            .lock()
            .ok()
            .and_then(|mut cache| cache.get(key).cloned())
    }

    fn cache_value(&self, key: &str, value: String) {
        if let Ok(mut cache) = self.value_cache.lock() {
            cache.put(key.to_owned(), value);
        }
    }

    fn forget_value(&self, key: &str) {
        if let Ok(mut cache) = self.value_cache.lock() {
            cache.pop(key);
        }
    }
}

impl KeyValueStore for FileStore {
    type Error = StoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.path_for(key)?;
        if let Some(value) = self.cached_value(key) {
            return Ok(Some(value));
        }
        match fs::read_to_string(&path) {
            Ok(value) => {
                self.cache_value(key, value.clone());
                Ok(Some(value))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key)?;
        self.forget_value(key);
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)?;
        self.cache_value(key, value.to_owned());
        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key)?;
        self.forget_value(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "Removed value");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process store, mainly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl KeyValueStore for MemoryStore {
    type Error = StoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let values = self.values.lock().map_err(|_| StoreError::LockError)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockError)?;
        values.insert(key.to_owned(), value.to_owned());
        drop(values);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockError)?;
        values.remove(key);
        drop(values);
        Ok(())
    }
}
