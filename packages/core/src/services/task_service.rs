//! Task Service - Structural Mutations and Tree Reads
//!
//! `TaskService` is the only component that writes tasks to the repository.
//! Every mutation follows validate-then-persist ordering:
//!
//! 1. Load whatever the rules need (task, parent, siblings, subtree)
//! 2. Run the checks in [`TreeInvariants`]
//! 3. Persist, compensating already-written records if a later write fails
//! 4. Emit a [`TaskEvent`] once the change is committed
//!
//! Structural edits are serialized by an async write lock, so one service
//! never has two moves or deletes interleaving their writes.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tasktree_core::config::TreeConfig;
//! use tasktree_core::db::InMemoryTaskStore;
//! use tasktree_core::models::TaskInput;
//! use tasktree_core::services::TaskService;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TaskService::new(Arc::new(InMemoryTaskStore::new()), TreeConfig::default());
//! service.ensure_root().await?;
//!
//! let parent = service.create_task(TaskInput::new("Launch")).await?;
//! let child = service
//!     .create_task(TaskInput::new("Write announcement").with_parent(&parent.id))
//!     .await?;
//! assert_eq!(child.path, vec![service.root_id().to_string(), parent.id, child.id.clone()]);
//! # Ok(())
//! # }
//! ```

use crate::config::{DeletePolicy, TreeConfig};
use crate::db::{TaskEvent, TaskStore};
use crate::models::{DeleteResult, Task, TaskFilter, TaskInput, TaskPatch, TaskTree};
use crate::services::error::{TaskResult, TaskServiceError};
use crate::services::tree_invariants::TreeInvariants;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Capacity of the domain event channel
const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Service for task hierarchy mutations and reads
///
/// Cheap to clone: clones share the store, the write lock and the event
/// channel.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,

    invariants: TreeInvariants,

    config: TreeConfig,

    /// Serializes structural edits
    write_lock: Arc<Mutex<()>>,

    /// Broadcast channel for domain events
    event_tx: broadcast::Sender<TaskEvent>,
}

impl TaskService {
    /// Create a service over a repository
    ///
    /// Call [`ensure_root`](Self::ensure_root) once before the first write.
    pub fn new(store: Arc<dyn TaskStore>, config: TreeConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            invariants: TreeInvariants::from_config(&config),
            config,
            write_lock: Arc::new(Mutex::new(())),
            event_tx,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn invariants(&self) -> &TreeInvariants {
        &self.invariants
    }

    pub fn root_id(&self) -> &str {
        self.invariants.root_id()
    }

    /// Subscribe to domain events emitted after committed mutations
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.event_tx.subscribe()
    }

    /// Ignores errors if no subscribers (expected in most tests).
    fn emit_event(&self, event: TaskEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Create the root sentinel if it doesn't exist yet
    ///
    /// Idempotent; returns the sentinel either way.
    pub async fn ensure_root(&self) -> TaskResult<Task> {
        let _guard = self.write_lock.lock().await;

        if let Some(root) = self.store.get_task(self.root_id()).await? {
            return Ok(root);
        }

        let root = self.store.insert_task(Task::root(self.root_id())).await?;
        tracing::info!("Created root task {}", root.id);
        Ok(root)
    }

    //
    // MUTATIONS
    //

    /// Create a task
    ///
    /// `input.parent_id` defaults to the sentinel and `input.order` to the end
    /// of the sibling list.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for bad field values or a taken `order`
    /// - `ParentNotFound` when the parent doesn't exist
    /// - `DepthExceeded` when the parent is already at the deepest level
    pub async fn create_task(&self, input: TaskInput) -> TaskResult<Task> {
        let _guard = self.write_lock.lock().await;
        self.create_locked(input)
            .await
            .inspect_err(|e| tracing::warn!(code = e.code(), "create_task rejected: {}", e))
    }

    async fn create_locked(&self, input: TaskInput) -> TaskResult<Task> {
        input.validate()?;

        let parent_id = input
            .parent_id
            .clone()
            .unwrap_or_else(|| self.root_id().to_string());
        let parent = self
            .store
            .get_task(&parent_id)
            .await?
            .ok_or_else(|| TaskServiceError::parent_not_found(&parent_id))?;

        self.invariants.validate_child_depth(&parent)?;

        let siblings = self.store.get_children(&parent.id).await?;
        let order = self.invariants.resolve_order(&siblings, input.order)?;

        let task = Task::from_input(input, parent.id.clone(), &parent.path, order);
        let created = self.store.insert_task(task).await?;

        tracing::debug!(
            "Created task {} under {} at order {}",
            created.id,
            parent.id,
            created.order
        );
        self.emit_event(TaskEvent::TaskCreated {
            task: created.clone(),
        });
        Ok(created)
    }

    /// Update a task
    ///
    /// When `patch.parent_id` names a different parent the update becomes a
    /// move (see [`move_task`](Self::move_task)) and the remaining fields are
    /// written together with the moved task. Otherwise the fields are applied
    /// in place; an explicit `order` must not be used by a sibling.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound` for an unknown id
    /// - `RootImmutable` for the sentinel
    /// - everything `move_task` can return when the parent changes
    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> TaskResult<Task> {
        let _guard = self.write_lock.lock().await;
        self.update_locked(id, patch)
            .await
            .inspect_err(|e| tracing::warn!(code = e.code(), "update_task {} rejected: {}", id, e))
    }

    async fn update_locked(&self, id: &str, patch: TaskPatch) -> TaskResult<Task> {
        patch.validate()?;

        if self.invariants.is_root(id) {
            return Err(TaskServiceError::root_immutable(id));
        }
        let mut task = self.require_task(id).await?;

        if let Some(new_parent_id) = patch.parent_id.as_deref() {
            if task.parent_id.as_deref() != Some(new_parent_id) {
                return self
                    .move_locked(task, new_parent_id, patch.order, Some(&patch))
                    .await;
            }
        }

        if let Some(order) = patch.order.filter(|o| *o != task.order) {
            let siblings = self.siblings_of(&task).await?;
            task.order = self.invariants.resolve_order(&siblings, Some(order))?;
        }

        task.apply_fields(&patch);
        let updated = self.store.update_task(task).await?;

        tracing::debug!("Updated task {}", updated.id);
        self.emit_event(TaskEvent::TaskUpdated {
            task: updated.clone(),
        });
        Ok(updated)
    }

    /// Move a task (with its subtree) under a new parent
    ///
    /// # Arguments
    ///
    /// * `id` - Task to move
    /// * `new_parent_id` - Destination parent (may be the sentinel)
    /// * `order` - Explicit sibling order, or `None` to append
    ///
    /// Paths of the task and every descendant are recomputed and written. If a
    /// write fails part-way, the records already written are restored before
    /// the error is returned. Moving a task onto its current parent without a
    /// new order returns it unchanged and emits nothing.
    ///
    /// # Errors
    ///
    /// - `RootImmutable` when moving the sentinel
    /// - `EntityNotFound` / `ParentNotFound` for unknown ids
    /// - `CycleError` when the destination is the task or one of its descendants
    /// - `DepthExceeded` when the deepest moved task would pass the bound
    /// - `ValidationFailed` when the requested order is taken
    pub async fn move_task(
        &self,
        id: &str,
        new_parent_id: &str,
        order: Option<i64>,
    ) -> TaskResult<Task> {
        let _guard = self.write_lock.lock().await;
        let result = async {
            if self.invariants.is_root(id) {
                return Err(TaskServiceError::root_immutable(id));
            }
            let task = self.require_task(id).await?;
            self.move_locked(task, new_parent_id, order, None).await
        }
        .await;
        result.inspect_err(|e| tracing::warn!(code = e.code(), "move_task {} rejected: {}", id, e))
    }

    async fn move_locked(
        &self,
        task: Task,
        new_parent_id: &str,
        order: Option<i64>,
        fields: Option<&TaskPatch>,
    ) -> TaskResult<Task> {
        if new_parent_id == task.id {
            return Err(TaskServiceError::cycle(&task.id, new_parent_id));
        }

        let in_place = task.parent_id.as_deref() == Some(new_parent_id)
            && order.map_or(true, |o| o == task.order);
        if in_place && fields.is_none() {
            tracing::debug!("Task {} already at the requested position", task.id);
            return Ok(task);
        }
        let new_parent = self
            .store
            .get_task(new_parent_id)
            .await?
            .ok_or_else(|| TaskServiceError::parent_not_found(new_parent_id))?;

        // Cheap check first: a descendant carries the task id in its path
        if new_parent.path.contains(&task.id) {
            return Err(TaskServiceError::cycle(&task.id, new_parent_id));
        }

        let descendants = self.store.get_subtree(&task.id).await?;
        let height = self.invariants.subtree_height(&task, &descendants);

        let ancestry = self.store.get_tasks(&new_parent.path).await?;
        let parent_links: HashMap<String, Option<String>> = ancestry
            .iter()
            .chain(descendants.iter())
            .map(|t| (t.id.clone(), t.parent_id.clone()))
            .collect();
        self.invariants
            .validate_reparent(&task.id, &new_parent, height, |id| {
                parent_links.get(id).cloned().flatten()
            })?;

        let same_parent = task.parent_id.as_deref() == Some(new_parent.id.as_str());
        let requested = if same_parent {
            order.or(Some(task.order))
        } else {
            order
        };
        let siblings: Vec<Task> = self
            .store
            .get_children(&new_parent.id)
            .await?
            .into_iter()
            .filter(|s| s.id != task.id)
            .collect();
        let new_order = self.invariants.resolve_order(&siblings, requested)?;

        let mut moved = task.clone();
        if let Some(fields) = fields {
            moved.apply_fields(fields);
        }
        moved.parent_id = Some(new_parent.id.clone());
        moved.path = self.invariants.compute_path(&new_parent.path, &moved.id);
        moved.order = new_order;
        moved.updated_at = Utc::now();

        let rebased = self.invariants.rebase_subtree(&moved, &descendants);

        let mut originals = Vec::with_capacity(1 + descendants.len());
        originals.push(task.clone());
        originals.extend(descendants);
        let mut writes = Vec::with_capacity(originals.len());
        writes.push(moved.clone());
        writes.extend(rebased);

        self.write_with_rollback(writes, &originals).await?;

        tracing::debug!(
            "Moved task {} from {:?} to {} at order {} ({} descendants rebased)",
            moved.id,
            task.parent_id,
            new_parent.id,
            moved.order,
            originals.len() - 1
        );
        self.emit_event(TaskEvent::TaskMoved {
            task: moved.clone(),
            old_parent_id: task.parent_id,
            old_path: task.path,
        });
        Ok(moved)
    }

    /// Delete a task
    ///
    /// With [`DeletePolicy::Cascade`] the whole subtree goes with it; with
    /// [`DeletePolicy::Reject`] a task that still has children is refused.
    ///
    /// # Returns
    ///
    /// The removed tasks, the target first and descendants parents first.
    ///
    /// # Errors
    ///
    /// - `RootDeletionForbidden` for the sentinel
    /// - `EntityNotFound` for an unknown id
    /// - `ChildrenExist` under the reject policy
    pub async fn delete_task(&self, id: &str) -> TaskResult<DeleteResult> {
        let _guard = self.write_lock.lock().await;
        self.delete_locked(id)
            .await
            .inspect_err(|e| tracing::warn!(code = e.code(), "delete_task {} rejected: {}", id, e))
    }

    async fn delete_locked(&self, id: &str) -> TaskResult<DeleteResult> {
        if self.invariants.is_root(id) {
            return Err(TaskServiceError::root_deletion_forbidden(id));
        }
        let task = self.require_task(id).await?;
        let descendants = self.store.get_subtree(id).await?;

        if !descendants.is_empty() && self.config.delete_policy == DeletePolicy::Reject {
            let child_count = descendants
                .iter()
                .filter(|d| d.parent_id.as_deref() == Some(id))
                .count();
            return Err(TaskServiceError::children_exist(id, child_count));
        }

        let mut removed = Vec::with_capacity(1 + descendants.len());
        removed.push(task);
        removed.extend(descendants);

        // Leaves first, so a failure never leaves a child without its parent
        let mut deleted: Vec<&Task> = Vec::with_capacity(removed.len());
        for task in removed.iter().rev() {
            if let Err(e) = self.store.delete_task(&task.id).await {
                tracing::warn!(
                    "Delete of {} failed after {} removals, restoring: {}",
                    task.id,
                    deleted.len(),
                    e
                );
                for restored in deleted.iter().rev() {
                    if let Err(restore_err) = self.store.insert_task((*restored).clone()).await {
                        tracing::error!("Failed to restore task {}: {}", restored.id, restore_err);
                    }
                }
                return Err(e.into());
            }
            deleted.push(task);
        }

        let result = DeleteResult { removed };
        tracing::debug!("Deleted task {} ({} tasks removed)", id, result.removed.len());
        self.emit_event(TaskEvent::TaskDeleted { ids: result.ids() });
        Ok(result)
    }

    /// Write `writes` one by one; on failure put back the matching
    /// `originals` of everything already written.
    async fn write_with_rollback(&self, writes: Vec<Task>, originals: &[Task]) -> TaskResult<()> {
        let by_id: HashMap<&str, &Task> = originals.iter().map(|t| (t.id.as_str(), t)).collect();
        let mut written: Vec<String> = Vec::with_capacity(writes.len());

        for task in writes {
            let id = task.id.clone();
            if let Err(e) = self.store.update_task(task).await {
                tracing::warn!(
                    "Write of {} failed after {} writes, compensating: {}",
                    id,
                    written.len(),
                    e
                );
                for done in written.iter().rev() {
                    let Some(original) = by_id.get(done.as_str()) else {
                        continue;
                    };
                    if let Err(restore_err) = self.store.update_task((*original).clone()).await {
                        tracing::error!("Failed to restore task {}: {}", done, restore_err);
                    }
                }
                return Err(e.into());
            }
            written.push(id);
        }
        Ok(())
    }

    //
    // READS
    //

    /// Get a task by id
    pub async fn get_task(&self, id: &str) -> TaskResult<Task> {
        self.require_task(id).await
    }

    /// Direct children of a task, ordered by `order`
    pub async fn get_children(&self, id: &str) -> TaskResult<Vec<Task>> {
        self.require_task(id).await?;
        Ok(self.store.get_children(id).await?)
    }

    /// A task with its whole subtree nested under `children`
    ///
    /// The subtree comes from one bulk repository query and is assembled in
    /// memory.
    pub async fn get_task_tree(&self, id: &str) -> TaskResult<TaskTree> {
        let task = self.require_task(id).await?;
        let descendants = self.store.get_subtree(id).await?;
        let adjacency = adjacency_list(descendants);
        Ok(build_tree(task, &adjacency))
    }

    /// Top-level tasks matching `filter`, each with its full subtree
    ///
    /// The filter applies to top-level tasks only; descendants are returned
    /// unfiltered.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> TaskResult<Vec<TaskTree>> {
        let everything = self.store.get_subtree(self.root_id()).await?;
        let adjacency = adjacency_list(everything);

        let trees = adjacency
            .get(self.root_id())
            .into_iter()
            .flatten()
            .filter(|task| filter.matches(task))
            .map(|task| build_tree(task.clone(), &adjacency))
            .collect();
        Ok(trees)
    }

    async fn require_task(&self, id: &str) -> TaskResult<Task> {
        self.store
            .get_task(id)
            .await?
            .ok_or_else(|| TaskServiceError::not_found(id))
    }

    async fn siblings_of(&self, task: &Task) -> TaskResult<Vec<Task>> {
        let Some(parent_id) = task.parent_id.as_deref() else {
            return Ok(Vec::new());
        };
        Ok(self
            .store
            .get_children(parent_id)
            .await?
            .into_iter()
            .filter(|s| s.id != task.id)
            .collect())
    }
}

/// parent_id → children sorted by order
fn adjacency_list(tasks: Vec<Task>) -> HashMap<String, Vec<Task>> {
    let mut adjacency: HashMap<String, Vec<Task>> = HashMap::new();
    for task in tasks {
        if let Some(parent_id) = task.parent_id.clone() {
            adjacency.entry(parent_id).or_default().push(task);
        }
    }
    for children in adjacency.values_mut() {
        children.sort_by_key(|t| t.order);
    }
    adjacency
}

fn build_tree(task: Task, adjacency: &HashMap<String, Vec<Task>>) -> TaskTree {
    let children = adjacency
        .get(&task.id)
        .into_iter()
        .flatten()
        .map(|child| build_tree(child.clone(), adjacency))
        .collect();
    TaskTree { task, children }
}

#[cfg(test)]
#[path = "task_service_test.rs"]
mod task_service_test;
