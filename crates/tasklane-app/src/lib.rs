//! Application layer logic for tasklane.
//!
//! This crate provides the sync service, the local cache, the group registry,
//! configuration, and the remote API client shared by front ends.

pub mod async_store;
pub mod config;
pub mod debounce;
pub mod group_registry;
pub mod remote;
pub mod service;
pub mod task_cache;

// Re-exports for convenience
pub use async_store::AsyncKeyValueStore;
pub use config::{ApiConfig, AppConfig, CacheConfig, DEFAULT_API_BASE_URL, StorageConfig};
pub use debounce::{AUTO_SAVE_DELAY, Debouncer};
pub use group_registry::{
    GROUPS_KEY, GroupCatalog, GroupError, GroupRegistry, NEXT_GROUP_ID_KEY, SELECTED_GROUP_KEY,
};
pub use remote::{ApiError, HttpTaskApi, RemoteTaskApi};
pub use service::{ListSource, Listing, Operation, SyncError, TaskSyncService};
pub use task_cache::{CACHE_KEY, CACHE_TIMESTAMP_KEY, DEFAULT_FRESHNESS, TaskCache};
