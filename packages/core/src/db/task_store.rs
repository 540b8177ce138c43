//! TaskStore Trait - Repository Abstraction
//!
//! This module defines the `TaskStore` trait through which the task service
//! reaches persistence. The service never sees the storage engine; any backend
//! that can store whole task records and answer the queries below can be
//! plugged in.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every method is async so network backends fit without
//!    changing the service
//! 2. **Whole Records**: writes take complete `Task` values; the service has
//!    already computed paths and orders
//! 3. **Error Handling**: uses `anyhow::Result`; the service wraps failures
//!    into `TaskServiceError::StoreError`
//! 4. **Per-Write Atomicity Only**: there are no multi-record transactions, so
//!    the service compensates partially applied structural edits itself
//!
//! # Examples
//!
//! ```rust
//! use tasktree_core::db::{InMemoryTaskStore, TaskStore};
//! use tasktree_core::models::{Task, DEFAULT_ROOT_ID};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
//! store.insert_task(Task::root(DEFAULT_ROOT_ID)).await?;
//! assert!(store.get_task(DEFAULT_ROOT_ID).await?.is_some());
//! # Ok(())
//! # }
//! ```

use crate::models::Task;
use anyhow::Result;
use async_trait::async_trait;

/// Abstraction layer for task persistence
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the service is shared between
/// request handlers.
///
/// # Ordering
///
/// Methods returning several tasks sort them by depth (`path.len()`), then by
/// `order`. Parents therefore always precede their children.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Get a task by id
    ///
    /// # Returns
    ///
    /// - `Ok(Some(task))` if the task exists
    /// - `Ok(None)` if it doesn't (not an error)
    async fn get_task(&self, id: &str) -> Result<Option<Task>>;

    /// Get several tasks by id. Unknown ids are skipped.
    async fn get_tasks(&self, ids: &[String]) -> Result<Vec<Task>>;

    /// Insert a new task record
    ///
    /// # Errors
    ///
    /// Returns error if a task with the same id already exists.
    async fn insert_task(&self, task: Task) -> Result<Task>;

    /// Replace an existing task record
    ///
    /// # Errors
    ///
    /// Returns error if the task doesn't exist.
    async fn update_task(&self, task: Task) -> Result<Task>;

    /// Delete a task record
    ///
    /// Does not touch descendants. Returns `false` when the id was unknown.
    async fn delete_task(&self, id: &str) -> Result<bool>;

    /// Direct children of a task, ordered by `order`
    async fn get_children(&self, parent_id: &str) -> Result<Vec<Task>>;

    /// Every descendant of a task (not the task itself)
    ///
    /// Answered with a single query over materialized paths: a task is a
    /// descendant when its `path` contains `id` before its last element.
    async fn get_subtree(&self, id: &str) -> Result<Vec<Task>>;
}
