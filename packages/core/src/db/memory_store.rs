//! In-memory TaskStore
//!
//! Reference repository used by tests and by the dev server. Records live in a
//! `HashMap` behind a mutex; every write is atomic on its own and nothing is
//! persisted across restarts.

use crate::db::TaskStore;
use crate::models::Task;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct StoreState {
    tasks: HashMap<String, Task>,
    /// Writes still allowed before the next one fails. `None` means unlimited.
    write_budget: Option<usize>,
    /// Same as `write_budget`, for subtree reads
    subtree_read_budget: Option<usize>,
}

/// In-memory task repository
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given tasks
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let tasks = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            state: Arc::new(Mutex::new(StoreState {
                tasks,
                ..Default::default()
            })),
        }
    }

    /// Let the next `writes` writes succeed, then fail exactly one write.
    ///
    /// Used to exercise compensating writes in the service.
    pub fn fail_write_after(&self, writes: usize) -> Result<()> {
        self.lock()?.write_budget = Some(writes);
        Ok(())
    }

    /// Cancel a failure armed by [`fail_write_after`](Self::fail_write_after)
    pub fn allow_writes(&self) -> Result<()> {
        self.lock()?.write_budget = None;
        Ok(())
    }

    /// Let the next `reads` calls to `get_subtree` succeed, then fail exactly
    /// one.
    pub fn fail_subtree_read_after(&self, reads: usize) -> Result<()> {
        self.lock()?.subtree_read_budget = Some(reads);
        Ok(())
    }

    /// Number of stored tasks, sentinel included
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.tasks.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of every stored task, sorted parents first
    pub fn snapshot(&self) -> Result<Vec<Task>> {
        let state = self.lock()?;
        Ok(sorted(state.tasks.values().cloned().collect()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Failed to acquire task store lock"))
    }
}

impl StoreState {
    fn consume_write(&mut self) -> Result<()> {
        consume(&mut self.write_budget, "write")
    }

    fn consume_subtree_read(&mut self) -> Result<()> {
        consume(&mut self.subtree_read_budget, "subtree read")
    }
}

fn consume(budget: &mut Option<usize>, what: &str) -> Result<()> {
    match *budget {
        Some(0) => {
            *budget = None;
            bail!("Simulated {} failure", what)
        }
        Some(remaining) => {
            *budget = Some(remaining - 1);
            Ok(())
        }
        None => Ok(()),
    }
}

fn sorted(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by(|a, b| {
        a.path
            .len()
            .cmp(&b.path.len())
            .then(a.order.cmp(&b.order))
            .then_with(|| a.id.cmp(&b.id))
    });
    tasks
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.lock()?.tasks.get(id).cloned())
    }

    async fn get_tasks(&self, ids: &[String]) -> Result<Vec<Task>> {
        let state = self.lock()?;
        Ok(sorted(
            ids.iter()
                .filter_map(|id| state.tasks.get(id).cloned())
                .collect(),
        ))
    }

    async fn insert_task(&self, task: Task) -> Result<Task> {
        let mut state = self.lock()?;
        if state.tasks.contains_key(&task.id) {
            bail!("Task '{}' already exists", task.id);
        }
        state.consume_write()?;
        state.tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn update_task(&self, task: Task) -> Result<Task> {
        let mut state = self.lock()?;
        if !state.tasks.contains_key(&task.id) {
            bail!("Task '{}' does not exist", task.id);
        }
        state.consume_write()?;
        state.tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn delete_task(&self, id: &str) -> Result<bool> {
        let mut state = self.lock()?;
        if !state.tasks.contains_key(id) {
            return Ok(false);
        }
        state.consume_write()?;
        Ok(state.tasks.remove(id).is_some())
    }

    async fn get_children(&self, parent_id: &str) -> Result<Vec<Task>> {
        let state = self.lock()?;
        Ok(sorted(
            state
                .tasks
                .values()
                .filter(|t| t.parent_id.as_deref() == Some(parent_id))
                .cloned()
                .collect(),
        ))
    }

    async fn get_subtree(&self, id: &str) -> Result<Vec<Task>> {
        let mut state = self.lock()?;
        state.consume_subtree_read()?;
        Ok(sorted(
            state
                .tasks
                .values()
                .filter(|t| {
                    t.path
                        .split_last()
                        .is_some_and(|(_, ancestors)| ancestors.iter().any(|a| a == id))
                })
                .cloned()
                .collect(),
        ))
    }
}
