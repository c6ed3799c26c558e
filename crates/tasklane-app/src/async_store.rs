//! Async adapter over the blocking key-value store.

use anyhow::{Error, anyhow};
use std::sync::Arc;
use tasklane_store::KeyValueStore;

/// Async storage trait used by the cache and group registry.
///
/// This mirrors [`tasklane_store::KeyValueStore`] but with async methods, so
/// persistence suspends the calling task instead of blocking the runtime.
#[allow(async_fn_in_trait)]
pub trait AsyncKeyValueStore: Send + Sync {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error> + Send;

    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error>;

    /// Remove every listed key.
    ///
    /// # Errors
    /// Returns a store-specific error when any removal fails.
    async fn remove_many(&self, keys: &[&str]) -> Result<(), Self::Error>;
}

impl<S> AsyncKeyValueStore for Arc<S>
where
    S: KeyValueStore + Send + Sync + 'static,
{
    type Error = Error;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let store = Arc::clone(self);
        let key = key.to_owned();
        tokio::task::spawn_blocking(move || S::get(&store, &key))
            .await
            .map_err(|e| anyhow!("Task join error: {e}"))?
            .map_err(Error::from)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error> {
        let store = Arc::clone(self);
        let key = key.to_owned();
        tokio::task::spawn_blocking(move || S::set(&store, &key, &value))
            .await
            .map_err(|e| anyhow!("Task join error: {e}"))?
            .map_err(Error::from)
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), Self::Error> {
        let store = Arc::clone(self);
        let keys: Vec<String> = keys.iter().map(|&k| k.to_owned()).collect();
        tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            S::remove_many(&store, &refs)
        })
        .await
        .map_err(|e| anyhow!("Task join error: {e}"))?
        .map_err(Error::from)
    }
}
