//! Task Session - one client's view of the task tree
//!
//! A session owns an [`OperationHistory`] and a [`TaskTreeCache`] and funnels
//! every intent of one client through [`TaskService`]. The state sits behind a
//! single async mutex, so a second edit waits for the first one to settle
//! instead of racing it.
//!
//! After each successful mutation the operation is recorded and the cache is
//! patched in place. Top-level tasks stay in the cache only while they match
//! the filter of the last `load`; descendants of a visible task are always
//! kept. Undo and redo reload the cache from the service with that filter.
//!
//! Once an inverse has been applied the undo/redo counts as done. A failed
//! reload afterwards empties the cache and marks it stale instead of
//! reporting an error, so a retry never inverts a second operation.

use crate::models::{DeleteResult, Task, TaskFilter, TaskInput, TaskPatch, TaskTree};
use crate::services::error::TaskResult;
use crate::services::history::{Operation, OperationHistory};
use crate::services::task_service::TaskService;
use crate::services::tree_cache::TaskTreeCache;
use tokio::sync::Mutex;

struct SessionState {
    history: OperationHistory,
    cache: TaskTreeCache,
    filter: TaskFilter,
    /// Set when a reload after undo/redo failed
    stale: bool,
}

/// Serialized intent stream of one client
pub struct TaskSession {
    service: TaskService,
    state: Mutex<SessionState>,
}

impl TaskSession {
    pub fn new(service: TaskService) -> Self {
        let state = SessionState {
            history: OperationHistory::new(service.config().history_capacity),
            cache: TaskTreeCache::new(service.root_id()),
            filter: TaskFilter::default(),
            stale: false,
        };
        Self {
            service,
            state: Mutex::new(state),
        }
    }

    pub fn service(&self) -> &TaskService {
        &self.service
    }

    /// Fetch the forest matching `filter` into the cache and start a fresh
    /// history.
    pub async fn load(&self, filter: TaskFilter) -> TaskResult<Vec<TaskTree>> {
        let mut state = self.state.lock().await;
        let trees = self.service.list_tasks(&filter).await?;

        state.cache.replace_all(trees.clone());
        state.history.clear();
        state.filter = filter;
        state.stale = false;
        Ok(trees)
    }

    pub async fn create(&self, input: TaskInput) -> TaskResult<Task> {
        let mut state = self.state.lock().await;
        let task = self.service.create_task(input).await?;

        state.history.record(Operation::created(&task));
        if state.is_visible(self.service.root_id(), &task) {
            state.cache.insert(task.clone());
        }
        Ok(task)
    }

    /// Update a task; recorded as a move when the parent changes
    pub async fn update(&self, id: &str, patch: TaskPatch) -> TaskResult<Task> {
        let mut state = self.state.lock().await;
        let before = self.service.get_task(id).await?;
        let after = self.service.update_task(id, patch).await?;

        state.reflect_change(self.service.root_id(), &before, &after);
        Ok(after)
    }

    pub async fn move_task(
        &self,
        id: &str,
        new_parent_id: &str,
        order: Option<i64>,
    ) -> TaskResult<Task> {
        let mut state = self.state.lock().await;
        let before = self.service.get_task(id).await?;
        let after = self.service.move_task(id, new_parent_id, order).await?;

        // moving onto the current position is not an operation
        if after != before {
            state.reflect_change(self.service.root_id(), &before, &after);
        }
        Ok(after)
    }

    pub async fn delete(&self, id: &str) -> TaskResult<DeleteResult> {
        let mut state = self.state.lock().await;
        let result = self.service.delete_task(id).await?;

        state.history.record(Operation::deleted(&result));
        if let Some(target) = result.removed.first() {
            state.cache.remove(&target.path);
        }
        Ok(result)
    }

    /// Undo the last operation; `Ok(None)` when there is nothing to undo
    pub async fn undo(&self) -> TaskResult<Option<Operation>> {
        let mut state = self.state.lock().await;
        let undone = state.history.undo(&self.service).await?;
        if undone.is_some() {
            self.refresh(&mut state).await;
        }
        Ok(undone)
    }

    /// Redo the last undone operation; `Ok(None)` when there is nothing to redo
    pub async fn redo(&self) -> TaskResult<Option<Operation>> {
        let mut state = self.state.lock().await;
        let redone = state.history.redo(&self.service).await?;
        if redone.is_some() {
            self.refresh(&mut state).await;
        }
        Ok(redone)
    }

    pub async fn clear_history(&self) {
        self.state.lock().await.history.clear();
    }

    pub async fn can_undo(&self) -> bool {
        self.state.lock().await.history.can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.state.lock().await.history.can_redo()
    }

    /// Whether the cache missed a reload; call [`load`](Self::load) to recover
    pub async fn is_stale(&self) -> bool {
        self.state.lock().await.stale
    }

    /// Copy of the cached forest
    pub async fn tree(&self) -> Vec<TaskTree> {
        self.state.lock().await.cache.roots().to_vec()
    }

    /// Recorded operations, oldest first
    pub async fn past_operations(&self) -> Vec<Operation> {
        self.state.lock().await.history.past().iter().cloned().collect()
    }

    /// Undone operations, next redo first
    pub async fn future_operations(&self) -> Vec<Operation> {
        self.state.lock().await.history.future().iter().cloned().collect()
    }

    async fn refresh(&self, state: &mut SessionState) {
        match self.service.list_tasks(&state.filter).await {
            Ok(trees) => {
                state.cache.replace_all(trees);
                state.stale = false;
            }
            Err(e) => {
                tracing::warn!("Reloading the task cache failed, marking it stale: {}", e);
                state.cache.replace_all(Vec::new());
                state.stale = true;
            }
        }
    }
}

impl SessionState {
    /// Top-level tasks must match the loaded filter
    fn is_visible(&self, root_id: &str, task: &Task) -> bool {
        task.parent_id.as_deref() != Some(root_id) || self.filter.matches(task)
    }

    fn reflect_change(&mut self, root_id: &str, before: &Task, after: &Task) {
        self.history.record(Operation::updated(before, after));
        let visible = self.is_visible(root_id, after);
        if !visible {
            self.cache.remove(&before.path);
        } else if before.path != after.path {
            self.cache.relocate(&before.path, after.clone());
        } else {
            self.cache.update(after.clone());
        }
    }
}
