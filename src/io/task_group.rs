//! Bounded task group for blocking row work.
//!
//! A semaphore caps how many tasks run at once; [`BoundedTaskGroup::join_all`]
//! waits for every task, successful or not, and yields outcomes in spawn
//! order. A failing task never cancels its siblings.

use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

/// Group of blocking tasks sharing a concurrency limit.
pub struct BoundedTaskGroup<T> {
    semaphore: Arc<Semaphore>,
    limit: usize,
    handles: Vec<JoinHandle<T>>,
}

impl<T: Send + 'static> BoundedTaskGroup<T> {
    /// Creates an empty group allowing `limit` tasks in flight (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            handles: Vec::with_capacity(limit),
        }
    }

    /// Concurrency limit of this group.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Number of tasks spawned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns whether no task has been spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for a free slot, then runs `task` on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the group's semaphore has been closed.
    pub async fn spawn_blocking<F>(&mut self, task: F) -> Result<()>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| Error::OperationFailed {
                operation: "task_group_acquire".to_string(),
                cause: e.to_string(),
            })?;

        self.handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        }));
        Ok(())
    }

    /// Waits for every task and returns their outcomes in spawn order.
    pub async fn join_all(self) -> Vec<std::result::Result<T, JoinError>> {
        let mut outcomes = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            outcomes.push(handle.await);
        }
        outcomes
    }
}
