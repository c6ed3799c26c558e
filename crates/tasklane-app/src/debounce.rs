//! Debounced execution of deferred actions, used for auto-saving edits.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Delay between the last edit and the automatic save.
pub const AUTO_SAVE_DELAY: Duration = Duration::from_secs(1);

/// Runs the most recently scheduled action once no new action arrived for `delay`.
///
/// Scheduling aborts the pending action, so a burst of edits collapses into one
/// write. Dropping the debouncer cancels whatever is still pending.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Debouncer using [`AUTO_SAVE_DELAY`].
    #[must_use]
    pub const fn auto_save() -> Self {
        Self::new(AUTO_SAVE_DELAY)
    }

    /// Quiet period before an action runs.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending action with `action`, to run after the quiet period.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(handle) {
            if !previous.is_finished() {
                debug!("Rescheduling pending action");
            }
            previous.abort();
        }
    }

    /// Drop the pending action, if any.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }

    /// Whether an action is waiting to run or still running.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::auto_save()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
