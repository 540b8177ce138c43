//! Domain Events for the task tree
//!
//! Events emitted by `TaskService` after a mutation has been committed to the
//! repository. They follow the observer pattern: any number of subscribers
//! (a UI bridge, a log sink, tests) can listen without coupling to the
//! service.
//!
//! # Architecture
//!
//! Events travel over a tokio broadcast channel. A subscriber that falls
//! behind loses the oldest events (`RecvError::Lagged`) rather than blocking
//! writers.

use crate::models::Task;
use serde::{Deserialize, Serialize};

/// Domain events emitted by `TaskService`
///
/// Serialized internally tagged, e.g. `{"type":"taskDeleted","ids":[...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaskEvent {
    /// A task was created
    TaskCreated { task: Task },

    /// Non-structural fields of a task changed
    TaskUpdated { task: Task },

    /// A task was reparented or reordered; descendants moved with it
    #[serde(rename_all = "camelCase")]
    TaskMoved {
        task: Task,
        old_parent_id: Option<String>,
        old_path: Vec<String>,
    },

    /// A task and any descendants removed with it
    TaskDeleted { ids: Vec<String> },
}

impl TaskEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            TaskEvent::TaskCreated { .. } => "task:created",
            TaskEvent::TaskUpdated { .. } => "task:updated",
            TaskEvent::TaskMoved { .. } => "task:moved",
            TaskEvent::TaskDeleted { .. } => "task:deleted",
        }
    }

    /// Id of the task the event is about (the deleted task for deletes)
    pub fn task_id(&self) -> Option<&str> {
        match self {
            TaskEvent::TaskCreated { task }
            | TaskEvent::TaskUpdated { task }
            | TaskEvent::TaskMoved { task, .. } => Some(&task.id),
            TaskEvent::TaskDeleted { ids } => ids.first().map(String::as_str),
        }
    }
}
