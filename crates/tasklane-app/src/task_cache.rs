//! Time-boxed local copy of the last known good task list.
//!
//! The cache is advisory: every persistence failure is logged and degrades to a
//! miss (reads) or a no-op (writes). It never surfaces an error to callers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tasklane_core::clock::unix_millis;
use tasklane_core::{Clock, SystemClock, Task};
use time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::async_store::AsyncKeyValueStore;

/// Key holding the serialized task list.
pub const CACHE_KEY: &str = "tasks_cache";
/// Key holding the write timestamp in Unix milliseconds.
///
/// When it is missing, the timestamp embedded in the entry is used instead. A
/// failed timestamp write removes the key so an older value never ages a newer list.
pub const CACHE_TIMESTAMP_KEY: &str = "tasks_cache_timestamp";
/// Maximum age of a usable cache entry.
pub const DEFAULT_FRESHNESS: Duration = Duration::minutes(5);

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    tasks: Vec<Task>,
    timestamp: i64,
}

/// Persistent task list cache with a freshness window.
///
/// All operations take a single writer lock, so read-modify-write patches issued by
/// concurrent mutations are applied one after another instead of overwriting each other.
pub struct TaskCache<S> {
    store: S,
    clock: Arc<dyn Clock>,
    freshness: Duration,
    writer: Mutex<()>,
}

impl<S: AsyncKeyValueStore> TaskCache<S> {
    /// Create a cache over `store` using the system clock and the default window.
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            freshness: DEFAULT_FRESHNESS,
            writer: Mutex::new(()),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the freshness window.
    #[must_use]
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    /// Time source shared with callers that stamp tasks.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Persist `tasks` with the current timestamp, replacing any previous entry.
    pub async fn save(&self, tasks: &[Task]) {
        let _guard = self.writer.lock().await;
        self.write_entry(tasks).await;
    }

    /// Return the cached list if it exists and is within the freshness window.
    ///
    /// An expired entry is cleared as a side effect.
    pub async fn load(&self) -> Option<Vec<Task>> {
        let _guard = self.writer.lock().await;
        self.read_entry().await
    }

    /// Remove the cached list and its timestamp.
    pub async fn clear(&self) {
        let _guard = self.writer.lock().await;
        self.clear_entry().await;
    }

    /// Whether a fresh entry exists.
    ///
    /// Reads the timestamp key and only decodes the entry when that key is missing.
    pub async fn is_valid(&self) -> bool {
        let _guard = self.writer.lock().await;
        let written = match self.read_timestamp().await {
            Some(written) => written,
            None => match self.read_raw_entry().await {
                Some(entry) => entry.timestamp,
                None => return false,
            },
        };
        self.is_fresh(written)
    }

    /// Read the current entry, let `patch` transform it, and write the result back.
    ///
    /// `patch` receives `None` when no fresh entry exists; returning `None` leaves
    /// the store untouched. The whole sequence runs under the writer lock.
    pub async fn update<F>(&self, patch: F)
    where
        F: FnOnce(Option<Vec<Task>>) -> Option<Vec<Task>>,
    {
        let _guard = self.writer.lock().await;
        let current = self.read_entry().await;
        if let Some(next) = patch(current) {
            self.write_entry(&next).await;
        }
    }

    async fn write_entry(&self, tasks: &[Task]) {
        let timestamp = unix_millis(self.clock.now());
        let entry = CacheEntry {
            tasks: tasks.to_vec(),
            timestamp,
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "Failed to encode tasks for cache");
                return;
            }
        };
        if let Err(err) = self.store.set(CACHE_KEY, payload).await {
            warn!(error = %into_anyhow(err), "Failed to save tasks to cache");
            return;
        }
        if let Err(err) = self
            .store
            .set(CACHE_TIMESTAMP_KEY, timestamp.to_string())
            .await
        {
            warn!(error = %into_anyhow(err), "Failed to save cache timestamp");
            if let Err(err) = self.store.remove_many(&[CACHE_TIMESTAMP_KEY]).await {
                warn!(error = %into_anyhow(err), "Failed to drop stale cache timestamp");
            }
            return;
        }
        debug!(count = tasks.len(), timestamp, "Saved tasks to cache");
    }

    async fn read_entry(&self) -> Option<Vec<Task>> {
        let stamp = self.read_timestamp().await;
        let entry = self.read_raw_entry().await?;
        let written = stamp.unwrap_or(entry.timestamp);
        if !self.is_fresh(written) {
            debug!(written, "Task cache expired");
            self.clear_entry().await;
            return None;
        }
        Some(entry.tasks)
    }

    async fn read_raw_entry(&self) -> Option<CacheEntry> {
        let payload = match self.store.get(CACHE_KEY).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %into_anyhow(err), "Failed to load tasks from cache");
                return None;
            }
        };
        match serde_json::from_str(&payload) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "Discarding unreadable task cache");
                None
            }
        }
    }

    async fn read_timestamp(&self) -> Option<i64> {
        match self.store.get(CACHE_TIMESTAMP_KEY).await {
            Ok(raw) => raw.and_then(|raw| raw.trim().parse().ok()),
            Err(err) => {
                warn!(error = %into_anyhow(err), "Failed to read cache timestamp");
                None
            }
        }
    }

    async fn clear_entry(&self) {
        if let Err(err) = self
            .store
            .remove_many(&[CACHE_KEY, CACHE_TIMESTAMP_KEY])
            .await
        {
            warn!(error = %into_anyhow(err), "Failed to clear cache");
        }
    }

    fn is_fresh(&self, written_millis: i64) -> bool {
        let age = unix_millis(self.clock.now()).saturating_sub(written_millis);
        i128::from(age) <= self.freshness.whole_milliseconds()
    }
}

fn into_anyhow<E: Into<anyhow::Error>>(err: E) -> anyhow::Error {
    err.into()
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex as StdMutex;
    use tasklane_core::{GroupId, ManualClock, TaskId, Tier};
    use tasklane_store::{KeyValueStore, MemoryStore};
    use time::macros::datetime;

    fn task(id: &str) -> Task {
        Task {
            id: TaskId::new(id),
            title: format!("task {id}"),
            description: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            tags: String::new(),
            priority: Tier::Low,
            priority_number: 10,
            completed: false,
            created_at: "2024-01-01T00:00:00.000Z".into(),
            group_id: GroupId(0),
        }
    }

    fn cache_with_clock() -> (TaskCache<Arc<MemoryStore>>, Arc<MemoryStore>, ManualClock) {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(datetime!(2024-05-01 09:00 UTC));
        let cache = TaskCache::new(Arc::clone(&store)).with_clock(Arc::new(clock.clone()));
        (cache, store, clock)
    }

    #[tokio::test]
    async fn save_then_load_within_window() {
        let (cache, _store, clock) = cache_with_clock();
        let tasks = vec![task("1"), task("2")];
        cache.save(&tasks).await;
        clock.advance(Duration::minutes(5));
        assert_eq!(cache.load().await, Some(tasks));
        assert!(cache.is_valid().await);
    }

    #[tokio::test]
    async fn expired_entry_is_absent_and_cleared() {
        let (cache, store, clock) = cache_with_clock();
        cache.save(&[task("1")]).await;
        clock.advance(Duration::minutes(5) + Duration::milliseconds(1));

        assert!(!cache.is_valid().await);
        assert_eq!(cache.load().await, None);
        assert_eq!(KeyValueStore::get(&*store, CACHE_KEY).expect("read"), None);
        assert_eq!(
            KeyValueStore::get(&*store, CACHE_TIMESTAMP_KEY).expect("read"),
            None
        );
    }

    #[tokio::test]
    async fn clear_removes_both_keys() {
        let (cache, store, _clock) = cache_with_clock();
        cache.save(&[task("1")]).await;
        cache.clear().await;
        assert_eq!(cache.load().await, None);
        assert!(!cache.is_valid().await);
        assert_eq!(KeyValueStore::get(&*store, CACHE_KEY).expect("read"), None);
    }

    #[tokio::test]
    async fn embedded_timestamp_is_used_when_key_missing() {
        let (cache, store, clock) = cache_with_clock();
        cache.save(&[task("1")]).await;
        KeyValueStore::remove(&*store, CACHE_TIMESTAMP_KEY).expect("remove");
        assert!(cache.is_valid().await);
        assert_eq!(cache.load().await.map(|t| t.len()), Some(1));

        clock.advance(Duration::minutes(6));
        assert!(!cache.is_valid().await);
        assert_eq!(cache.load().await, None);
    }

    struct TimestampRejectingStore {
        inner: MemoryStore,
    }

    impl AsyncKeyValueStore for TimestampRejectingStore {
        type Error = anyhow::Error;

        async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
            Ok(KeyValueStore::get(&self.inner, key)?)
        }

        async fn set(&self, key: &str, value: String) -> Result<(), Self::Error> {
            if key == CACHE_TIMESTAMP_KEY {
                return Err(anyhow!("timestamp write rejected"));
            }
            Ok(KeyValueStore::set(&self.inner, key, &value)?)
        }

        async fn remove_many(&self, keys: &[&str]) -> Result<(), Self::Error> {
            Ok(KeyValueStore::remove_many(&self.inner, keys)?)
        }
    }

    #[tokio::test]
    async fn failed_timestamp_write_does_not_age_new_entry() {
        let start = datetime!(2024-05-01 09:00 UTC);
        let clock = ManualClock::starting_at(start);
        let store = TimestampRejectingStore {
            inner: MemoryStore::with_entries([(
                CACHE_TIMESTAMP_KEY,
                unix_millis(start - Duration::hours(1)).to_string(),
            )]),
        };
        let cache = TaskCache::new(store).with_clock(Arc::new(clock.clone()));

        cache.save(&[task("1")]).await;
        assert_eq!(
            KeyValueStore::get(&cache.store.inner, CACHE_TIMESTAMP_KEY).expect("read"),
            None
        );
        clock.advance(Duration::minutes(3));
        assert!(cache.is_valid().await);
        assert_eq!(cache.load().await.map(|t| t.len()), Some(1));
    }

    #[tokio::test]
    async fn corrupt_payload_reads_as_miss() {
        let (cache, store, _clock) = cache_with_clock();
        KeyValueStore::set(&*store, CACHE_KEY, "{not json").expect("write");
        assert_eq!(cache.load().await, None);
    }

    #[tokio::test]
    async fn update_patches_under_lock() {
        let (cache, _store, _clock) = cache_with_clock();
        cache
            .update(|current| {
                assert!(current.is_none());
                None
            })
            .await;
        assert_eq!(cache.load().await, None);

        cache.save(&[task("1")]).await;
        cache
            .update(|current| {
                let mut tasks = current.unwrap_or_default();
                tasks.insert(0, task("2"));
                Some(tasks)
            })
            .await;
        let ids: Vec<String> = cache
            .load()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.id.0)
            .collect();
        assert_eq!(ids, vec!["2".to_string(), "1".to_string()]);
    }

    struct BrokenStore {
        reads: StdMutex<u32>,
    }

    impl AsyncKeyValueStore for BrokenStore {
        type Error = anyhow::Error;

        async fn get(&self, _key: &str) -> Result<Option<String>, Self::Error> {
            *self.reads.lock().expect("lock") += 1;
            Err(anyhow!("disk unavailable"))
        }

        async fn set(&self, _key: &str, _value: String) -> Result<(), Self::Error> {
            Err(anyhow!("disk full"))
        }

        async fn remove_many(&self, _keys: &[&str]) -> Result<(), Self::Error> {
            Err(anyhow!("disk unavailable"))
        }
    }

    #[tokio::test]
    async fn persistence_failures_degrade_to_miss() {
        let cache = TaskCache::new(BrokenStore {
            reads: StdMutex::new(0),
        });
        cache.save(&[task("1")]).await;
        assert_eq!(cache.load().await, None);
        assert!(!cache.is_valid().await);
        cache.clear().await;
        assert!(*cache.store.reads.lock().expect("lock") >= 2);
    }
}
