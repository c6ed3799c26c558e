//! Task Sync Service: remote-first task operations with a best-effort local cache.

use std::fmt;

use tasklane_core::{
    Task, TaskDraft, TaskFilter, TaskId, TaskPatch, TaskValidationError, sort_newest_first,
    to_internal,
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::async_store::AsyncKeyValueStore;
use crate::remote::RemoteTaskApi;
use crate::task_cache::TaskCache;

/// Remote operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Fetching the task list.
    List,
    /// Creating a task.
    Create,
    /// Updating a task.
    Update,
    /// Deleting a task.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list tasks",
            Self::Create => "create task",
            Self::Update => "update task",
            Self::Delete => "delete task",
        })
    }
}

/// Failure of a sync operation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The backend call failed and nothing could mask it.
    #[error("failed to {operation}: {source}")]
    Remote {
        /// Operation that failed.
        operation: Operation,
        /// Error reported by the API client.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Input was rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] TaskValidationError),
}

/// Where a task list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    /// Fresh from the backend.
    Remote,
    /// Served from the local cache after the backend failed.
    Cache,
}

/// Result of a list call together with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Tasks, newest first.
    pub tasks: Vec<Task>,
    /// Whether the list came from the backend or the cache.
    pub source: ListSource,
}

/// Coordinates the remote API and the local cache.
///
/// Each call is a self-contained attempt. Only list reads fall back to the cache;
/// mutations always report remote failures and leave the cache untouched.
pub struct TaskSyncService<R, S> {
    remote: R,
    cache: TaskCache<S>,
}

impl<R, S> TaskSyncService<R, S>
where
    R: RemoteTaskApi,
    S: AsyncKeyValueStore,
{
    /// Combine a backend client with a cache.
    pub const fn new(remote: R, cache: TaskCache<S>) -> Self {
        Self { remote, cache }
    }

    /// Access the underlying cache.
    pub const fn cache(&self) -> &TaskCache<S> {
        &self.cache
    }

    /// Fetch the task list, reporting whether it was served remotely or from cache.
    ///
    /// # Errors
    /// Returns [`SyncError::Remote`] when the backend fails and no fresh cache exists.
    pub async fn list_with_source(&self) -> Result<Listing, SyncError> {
        match self.remote.list_tasks().await {
            Ok(wire) => {
                let now = self.cache.clock().now();
                let mut tasks: Vec<Task> =
                    wire.into_iter().map(|w| to_internal(w, now)).collect();
                sort_newest_first(&mut tasks);
                self.cache.save(&tasks).await;
                info!(count = tasks.len(), "Fetched tasks from API");
                Ok(Listing {
                    tasks,
                    source: ListSource::Remote,
                })
            }
            Err(err) => {
                error!(error = %err, "Failed to fetch tasks from API");
                match self.cache.load().await {
                    Some(tasks) => {
                        warn!(count = tasks.len(), "Serving cached tasks");
                        Ok(Listing {
                            tasks,
                            source: ListSource::Cache,
                        })
                    }
                    None => Err(remote_error(Operation::List, err)),
                }
            }
        }
    }

    /// Fetch the task list, newest first.
    ///
    /// # Errors
    /// Returns [`SyncError::Remote`] when the backend fails and no fresh cache exists.
    pub async fn list(&self) -> Result<Vec<Task>, SyncError> {
        Ok(self.list_with_source().await?.tasks)
    }

    /// Fetch the task list and keep the tasks matching `filter`, preserving order.
    ///
    /// # Errors
    /// Same as [`list`](Self::list).
    pub async fn list_filtered(&self, filter: &TaskFilter) -> Result<Vec<Task>, SyncError> {
        let tasks = self.list().await?;
        Ok(filter.apply(tasks))
    }

    /// Look up a task in the cache without contacting the backend.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.cache
            .load()
            .await?
            .into_iter()
            .find(|task| &task.id == id)
    }

    /// Create a task remotely and prepend it to the cached list.
    ///
    /// # Errors
    /// Returns [`SyncError::Validation`] for rejected input and [`SyncError::Remote`]
    /// when the backend call fails.
    pub async fn create(&self, draft: &TaskDraft) -> Result<Task, SyncError> {
        draft.validate()?;
        let wire = self
            .remote
            .create_task(draft)
            .await
            .map_err(|err| logged_remote_error(Operation::Create, err))?;
        let task = to_internal(wire, self.cache.clock().now());

        let created = task.clone();
        self.cache
            .update(move |current| {
                let mut tasks = current.unwrap_or_default();
                tasks.insert(0, created);
                Some(tasks)
            })
            .await;
        info!(id = %task.id, "Created task");
        Ok(task)
    }

    /// Apply a partial update remotely and replace the cached copy.
    ///
    /// # Errors
    /// Returns [`SyncError::Validation`] for rejected input and [`SyncError::Remote`]
    /// when the backend call fails.
    pub async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, SyncError> {
        patch.validate()?;
        let wire = self
            .remote
            .update_task(id, patch)
            .await
            .map_err(|err| logged_remote_error(Operation::Update, err))?;
        let task = to_internal(wire, self.cache.clock().now());

        let updated = task.clone();
        self.cache
            .update(move |current| {
                let mut tasks = current?;
                for slot in tasks.iter_mut().filter(|t| t.id == updated.id) {
                    *slot = updated.clone();
                }
                Some(tasks)
            })
            .await;
        info!(id = %task.id, "Updated task");
        Ok(task)
    }

    /// Delete a task remotely and drop it from the cached list.
    ///
    /// # Errors
    /// Returns [`SyncError::Remote`] when the backend call fails.
    pub async fn delete(&self, id: &TaskId) -> Result<(), SyncError> {
        self.remote
            .delete_task(id)
            .await
            .map_err(|err| logged_remote_error(Operation::Delete, err))?;

        self.cache
            .update(|current| {
                let mut tasks = current?;
                tasks.retain(|t| &t.id != id);
                Some(tasks)
            })
            .await;
        info!(id = %id, "Deleted task");
        Ok(())
    }

    /// Set the completion flag of a task.
    ///
    /// # Errors
    /// Same as [`update`](Self::update).
    pub async fn toggle_completion(&self, id: &TaskId, completed: bool) -> Result<Task, SyncError> {
        self.update(id, &TaskPatch::completion(completed)).await
    }
}

fn remote_error<E>(operation: Operation, err: E) -> SyncError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SyncError::Remote {
        operation,
        source: Box::new(err),
    }
}

fn logged_remote_error<E>(operation: Operation, err: E) -> SyncError
where
    E: std::error::Error + Send + Sync + 'static,
{
    error!(operation = %operation, error = %err, "API call failed");
    remote_error(operation, err)
}
