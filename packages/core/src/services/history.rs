//! Operation History - Undo/Redo for task mutations
//!
//! Every committed mutation of a session is recorded as an [`Operation`]
//! holding enough snapshots to invert it. Undo executes the inverse through
//! [`TaskService`], so it is subject to exactly the same tree checks as any
//! other edit; redo replays the forward action.
//!
//! # Lifecycle
//!
//! ```text
//! record ──► past ──undo──► future
//!             ▲               │
//!             └─────redo──────┘
//! ```
//!
//! Recording a new operation clears `future`. The history is bounded: when it
//! grows past its capacity the oldest entries are dropped.
//!
//! # Recreated tasks
//!
//! Undoing a delete (or redoing a create) recreates tasks, and the repository
//! hands out new ids. The old → new id mapping is applied to every entry in
//! both lists (ids, parent ids and paths), so later undo/redo steps target the
//! live tasks.
//!
//! # Failure
//!
//! When the inverse fails the history is left exactly as it was and the error
//! is returned. A delete whose undo fails half-way removes the tasks it had
//! already recreated before returning.

use crate::models::{DeleteResult, Task, TaskInput, TaskPatch};
use crate::services::error::TaskResult;
use crate::services::task_service::TaskService;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A task as it was at one moment: identity, position and form data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: String,
    pub path: Vec<String>,
    pub order: i64,
    /// Form data, including `parent_id` and `order`
    pub form: TaskInput,
}

impl TaskSnapshot {
    pub fn of(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            path: task.path.clone(),
            order: task.order,
            form: task.to_input(),
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.form.parent_id.as_deref()
    }

    /// Patch putting a live task back into this state
    pub fn restore_patch(&self) -> TaskPatch {
        TaskPatch::restore(&self.form)
    }

    fn remap(&mut self, ids: &HashMap<String, String>) {
        if let Some(new_id) = ids.get(&self.id) {
            self.id = new_id.clone();
        }
        for segment in self.path.iter_mut() {
            if let Some(new_id) = ids.get(segment.as_str()) {
                *segment = new_id.clone();
            }
        }
        if let Some(parent_id) = self.form.parent_id.as_mut() {
            if let Some(new_id) = ids.get(parent_id.as_str()) {
                *parent_id = new_id.clone();
            }
        }
    }
}

/// A recorded, invertible mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    /// A task was created; undo deletes it
    Create { task: TaskSnapshot },

    /// Fields changed in place; undo restores `before`
    Update {
        before: TaskSnapshot,
        after: TaskSnapshot,
    },

    /// The task changed parent; undo moves it back
    Move {
        before: TaskSnapshot,
        after: TaskSnapshot,
    },

    /// A task and its subtree were deleted (target first, parents before
    /// children); undo recreates all of them
    Delete { removed: Vec<TaskSnapshot> },
}

impl Operation {
    pub fn created(task: &Task) -> Self {
        Self::Create {
            task: TaskSnapshot::of(task),
        }
    }

    /// `Move` when the parent changed, `Update` otherwise
    pub fn updated(before: &Task, after: &Task) -> Self {
        let before_snapshot = TaskSnapshot::of(before);
        let after_snapshot = TaskSnapshot::of(after);
        if before.parent_id != after.parent_id {
            Self::Move {
                before: before_snapshot,
                after: after_snapshot,
            }
        } else {
            Self::Update {
                before: before_snapshot,
                after: after_snapshot,
            }
        }
    }

    pub fn deleted(result: &DeleteResult) -> Self {
        Self::Delete {
            removed: result.removed.iter().map(TaskSnapshot::of).collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Move { .. } => "move",
            Self::Delete { .. } => "delete",
        }
    }

    /// Id of the task the operation is about
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Create { task } => Some(&task.id),
            Self::Update { after, .. } | Self::Move { after, .. } => Some(&after.id),
            Self::Delete { removed } => removed.first().map(|s| s.id.as_str()),
        }
    }

    fn remap(&mut self, ids: &HashMap<String, String>) {
        match self {
            Self::Create { task } => task.remap(ids),
            Self::Update { before, after } | Self::Move { before, after } => {
                before.remap(ids);
                after.remap(ids);
            }
            Self::Delete { removed } => removed.iter_mut().for_each(|s| s.remap(ids)),
        }
    }
}

/// Bounded undo/redo history for one session
#[derive(Debug, Clone)]
pub struct OperationHistory {
    past: VecDeque<Operation>,
    future: VecDeque<Operation>,
    capacity: usize,
}

impl OperationHistory {
    /// A `capacity` of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a committed mutation; clears the redo list
    pub fn record(&mut self, operation: Operation) {
        self.past.push_back(operation);
        self.future.clear();
        self.trim();
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Oldest first
    pub fn past(&self) -> &VecDeque<Operation> {
        &self.past
    }

    /// Next redo first
    pub fn future(&self) -> &VecDeque<Operation> {
        &self.future
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Invert the most recent operation
    ///
    /// # Returns
    ///
    /// - `Ok(Some(op))` with the entry now at the front of `future`
    /// - `Ok(None)` when there is nothing to undo
    pub async fn undo(&mut self, service: &TaskService) -> TaskResult<Option<Operation>> {
        let Some(operation) = self.past.back().cloned() else {
            return Ok(None);
        };

        match &operation {
            Operation::Create { task } => {
                service.delete_task(&task.id).await?;
            }
            Operation::Update { before, .. } | Operation::Move { before, .. } => {
                service
                    .update_task(&before.id, before.restore_patch())
                    .await?;
            }
            Operation::Delete { removed } => {
                let ids = recreate(service, removed).await?;
                self.remap_all(&ids);
            }
        }

        let Some(undone) = self.past.pop_back() else {
            return Ok(None);
        };
        tracing::debug!("Undid {} of {:?}", undone.kind(), undone.task_id());
        self.future.push_front(undone.clone());
        Ok(Some(undone))
    }

    /// Replay the most recently undone operation
    ///
    /// # Returns
    ///
    /// - `Ok(Some(op))` with the entry now at the end of `past`
    /// - `Ok(None)` when there is nothing to redo
    pub async fn redo(&mut self, service: &TaskService) -> TaskResult<Option<Operation>> {
        let Some(operation) = self.future.front().cloned() else {
            return Ok(None);
        };

        match &operation {
            Operation::Create { task } => {
                let created = service.create_task(task.form.clone()).await?;
                if created.id != task.id {
                    self.remap_all(&HashMap::from([(task.id.clone(), created.id)]));
                }
            }
            Operation::Update { after, .. } | Operation::Move { after, .. } => {
                service
                    .update_task(&after.id, after.restore_patch())
                    .await?;
            }
            Operation::Delete { removed } => {
                if let Some(target) = removed.first() {
                    service.delete_task(&target.id).await?;
                }
            }
        }

        let Some(redone) = self.future.pop_front() else {
            return Ok(None);
        };
        tracing::debug!("Redid {} of {:?}", redone.kind(), redone.task_id());
        self.past.push_back(redone.clone());
        self.trim();
        Ok(Some(redone))
    }

    fn remap_all(&mut self, ids: &HashMap<String, String>) {
        if ids.is_empty() {
            return;
        }
        self.past
            .iter_mut()
            .chain(self.future.iter_mut())
            .for_each(|op| op.remap(ids));
    }

    fn trim(&mut self) {
        while self.past.len() > self.capacity {
            self.past.pop_front();
        }
    }
}

/// Recreate deleted tasks parents first, returning old id → new id.
///
/// On failure the tasks recreated so far are deleted again (best effort).
async fn recreate(
    service: &TaskService,
    removed: &[TaskSnapshot],
) -> TaskResult<HashMap<String, String>> {
    let mut ids: HashMap<String, String> = HashMap::new();
    let mut created: Vec<String> = Vec::with_capacity(removed.len());

    for snapshot in removed {
        let mut form = snapshot.form.clone();
        if let Some(parent_id) = form.parent_id.as_mut() {
            if let Some(new_id) = ids.get(parent_id.as_str()) {
                *parent_id = new_id.clone();
            }
        }

        match service.create_task(form).await {
            Ok(task) => {
                created.push(task.id.clone());
                ids.insert(snapshot.id.clone(), task.id);
            }
            Err(e) => {
                tracing::warn!(
                    "Recreating {} failed after {} tasks, rolling back: {}",
                    snapshot.id,
                    created.len(),
                    e
                );
                for id in created.iter().rev() {
                    if let Err(rollback_err) = service.delete_task(id).await {
                        tracing::error!("Failed to roll back recreated task {}: {}", id, rollback_err);
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(ids)
}
