//! Tree Invariants
//!
//! Pure validation and derivation for the materialized task tree. Nothing in
//! here touches the repository: callers load whatever tasks are needed and
//! pass them in, which keeps every rule unit-testable without a store.
//!
//! Invariants maintained for every stored task:
//!
//! 1. No task is its own ancestor through `parent_id` links
//! 2. `path == [...parent.path, id]`
//! 3. `path.len() <= max_depth`
//! 4. `order` is unique within a sibling group

use crate::config::TreeConfig;
use crate::models::{Task, ValidationError};
use crate::services::error::{TaskResult, TaskServiceError};
use std::collections::{HashMap, HashSet, VecDeque};

/// Validation and derivation rules for the task tree
#[derive(Debug, Clone)]
pub struct TreeInvariants {
    root_id: String,
    max_depth: usize,
}

impl TreeInvariants {
    pub fn new(root_id: impl Into<String>, max_depth: usize) -> Self {
        Self {
            root_id: root_id.into(),
            max_depth,
        }
    }

    pub fn from_config(config: &TreeConfig) -> Self {
        Self::new(config.root_id.clone(), config.max_depth)
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_root(&self, id: &str) -> bool {
        id == self.root_id
    }

    /// Check that `task_id` (with a subtree `subtree_height` levels deep) may
    /// be moved under `new_parent`.
    ///
    /// # Arguments
    ///
    /// * `task_id` - Task being moved
    /// * `new_parent` - Prospective parent
    /// * `subtree_height` - Levels below the moved task (0 for a leaf)
    /// * `lookup` - Resolves a task id to its `parent_id`
    ///
    /// The ancestor walk starts at the new parent and stops at the sentinel, at
    /// a task without parent, or at an id `lookup` cannot resolve. Revisiting
    /// an id is reported as a cycle even if it is not `task_id`, so corrupt
    /// parent links can never loop forever.
    ///
    /// # Errors
    ///
    /// - `RootImmutable` when `task_id` is the sentinel
    /// - `CycleError` when `new_parent` is the task itself or one of its descendants
    /// - `DepthExceeded` when the deepest moved task would pass `max_depth`
    pub fn validate_reparent<F>(
        &self,
        task_id: &str,
        new_parent: &Task,
        subtree_height: usize,
        lookup: F,
    ) -> TaskResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.is_root(task_id) {
            return Err(TaskServiceError::root_immutable(task_id));
        }
        if new_parent.id == task_id {
            return Err(TaskServiceError::cycle(task_id, &new_parent.id));
        }

        let mut visited = HashSet::new();
        let mut cursor = Some(new_parent.id.clone());
        while let Some(current) = cursor {
            if current == task_id || !visited.insert(current.clone()) {
                return Err(TaskServiceError::cycle(task_id, &new_parent.id));
            }
            if self.is_root(&current) {
                break;
            }
            cursor = lookup(&current);
        }

        let attempted_depth = new_parent.path.len() + 1 + subtree_height;
        if attempted_depth > self.max_depth {
            return Err(TaskServiceError::depth_exceeded(
                task_id,
                attempted_depth,
                self.max_depth,
            ));
        }
        Ok(())
    }

    /// Check that `parent` may receive a new child; returns the child's depth.
    ///
    /// The error names the parent since the child has no id yet.
    pub fn validate_child_depth(&self, parent: &Task) -> TaskResult<usize> {
        let depth = parent.path.len() + 1;
        if depth > self.max_depth {
            return Err(TaskServiceError::depth_exceeded(
                &parent.id,
                depth,
                self.max_depth,
            ));
        }
        Ok(depth)
    }

    /// `[...parent_path, task_id]`
    pub fn compute_path(&self, parent_path: &[String], task_id: &str) -> Vec<String> {
        let mut path = Vec::with_capacity(parent_path.len() + 1);
        path.extend_from_slice(parent_path);
        path.push(task_id.to_string());
        path
    }

    /// Recompute the path of every descendant of `moved`, whose own path is
    /// already up to date.
    ///
    /// Follows `parent_id` links rather than the stale paths, so the input may
    /// come in any order. Returns the rebased descendants parents first;
    /// tasks not connected to `moved` are dropped.
    pub fn rebase_subtree(&self, moved: &Task, descendants: &[Task]) -> Vec<Task> {
        let mut paths: HashMap<&str, Vec<String>> = HashMap::new();
        paths.insert(moved.id.as_str(), moved.path.clone());

        let mut rebased = Vec::with_capacity(descendants.len());
        for (task, _) in walk_descendants(&moved.id, descendants) {
            let parent_path = task
                .parent_id
                .as_deref()
                .and_then(|p| paths.get(p))
                .cloned()
                .unwrap_or_default();
            let path = self.compute_path(&parent_path, &task.id);
            paths.insert(task.id.as_str(), path.clone());

            let mut task = task.clone();
            task.path = path;
            rebased.push(task);
        }
        rebased
    }

    /// Levels below `task` (0 for a leaf)
    pub fn subtree_height(&self, task: &Task, descendants: &[Task]) -> usize {
        walk_descendants(&task.id, descendants)
            .into_iter()
            .map(|(_, level)| level)
            .max()
            .unwrap_or(0)
    }

    /// Order for a task appended to the end of `siblings`.
    ///
    /// `siblings.len()`, unless gaps left that value in use, in which case one
    /// past the highest order.
    pub fn next_order(&self, siblings: &[Task]) -> i64 {
        let len = siblings.len() as i64;
        if siblings.iter().any(|s| s.order == len) {
            siblings.iter().map(|s| s.order).max().unwrap_or(-1) + 1
        } else {
            len
        }
    }

    /// Honour an explicit order when no sibling uses it, else append.
    ///
    /// `siblings` must not contain the task being placed.
    pub fn resolve_order(
        &self,
        siblings: &[Task],
        requested: Option<i64>,
    ) -> Result<i64, ValidationError> {
        match requested {
            None => Ok(self.next_order(siblings)),
            Some(order) if order < 0 => Err(ValidationError::invalid_value(
                "order",
                format!("{} must not be negative", order),
            )),
            Some(order) => match siblings.iter().find(|s| s.order == order) {
                Some(taken) => Err(ValidationError::OrderTaken {
                    order,
                    sibling_id: taken.id.clone(),
                }),
                None => Ok(order),
            },
        }
    }
}

/// Breadth-first walk of the tasks hanging below `root_id`, with their level
/// (1 = direct child). Parents always come before their children.
fn walk_descendants<'a>(root_id: &str, descendants: &'a [Task]) -> Vec<(&'a Task, usize)> {
    let mut by_parent: HashMap<&str, Vec<&Task>> = HashMap::new();
    for task in descendants {
        if let Some(parent_id) = task.parent_id.as_deref() {
            by_parent.entry(parent_id).or_default().push(task);
        }
    }
    for children in by_parent.values_mut() {
        children.sort_by_key(|t| t.order);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(descendants.len());
    let mut queue = VecDeque::from([(root_id, 0usize)]);
    while let Some((id, level)) = queue.pop_front() {
        for child in by_parent.get(id).into_iter().flatten() {
            if seen.insert(child.id.as_str()) {
                out.push((*child, level + 1));
                queue.push_back((child.id.as_str(), level + 1));
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "tree_invariants_test.rs"]
mod tree_invariants_test;
