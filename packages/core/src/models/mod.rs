//! Data Models
//!
//! This module contains the data structures used throughout the task tree:
//!
//! - `Task` - a stored task with its materialized path and sibling order
//! - `TaskInput` / `TaskPatch` - create and partial-update payloads
//! - `TaskTree` - a task with its nested children, assembled on read
//! - `TaskFilter` - listing criteria
//! - priority scoring helpers

mod filter;
mod priority;
mod task;

pub use filter::TaskFilter;
pub use priority::{base_score, calculate_priority_score, determine_priority, progress, remaining_hours};
pub use task::{
    DeleteResult, Task, TaskInput, TaskPatch, TaskPriority, TaskStatus, TaskTree, ValidationError,
    DEFAULT_ROOT_ID, ROOT_TITLE,
};
