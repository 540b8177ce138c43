//! Service Layer Error Types
//!
//! This module defines the error type for task service operations. Every
//! variant carries the ids (and depths) involved so callers can report the
//! failure precisely, and maps to a stable machine-readable code.

use crate::models::ValidationError;
use thiserror::Error;

/// Task service operation errors
#[derive(Error, Debug)]
pub enum TaskServiceError {
    /// Referenced parent does not exist
    #[error("Parent task not found: {parent_id}")]
    ParentNotFound { parent_id: String },

    /// The move would make a task its own ancestor
    #[error("Moving task {task_id} under {new_parent_id} would create a cycle")]
    CycleError {
        task_id: String,
        new_parent_id: String,
    },

    /// The operation would place a task below the depth bound
    #[error("Task {task_id} would reach depth {attempted_depth} (maximum {max_depth})")]
    DepthExceeded {
        task_id: String,
        attempted_depth: usize,
        max_depth: usize,
    },

    /// The root sentinel cannot be deleted
    #[error("The root task {root_id} cannot be deleted")]
    RootDeletionForbidden { root_id: String },

    /// The root sentinel cannot be edited or moved
    #[error("The root task {root_id} cannot be modified")]
    RootImmutable { root_id: String },

    /// Task not found by id
    #[error("Task not found: {id}")]
    EntityNotFound { id: String },

    /// Delete refused because the task still has children
    #[error("Task {id} still has {child_count} child task(s)")]
    ChildrenExist { id: String, child_count: usize },

    /// Field validation failed
    #[error("Task validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Repository operation failed
    #[error("Task store operation failed: {0}")]
    StoreError(#[from] anyhow::Error),
}

impl TaskServiceError {
    /// Create a parent not found error
    pub fn parent_not_found(parent_id: impl Into<String>) -> Self {
        Self::ParentNotFound {
            parent_id: parent_id.into(),
        }
    }

    /// Create a cycle error
    pub fn cycle(task_id: impl Into<String>, new_parent_id: impl Into<String>) -> Self {
        Self::CycleError {
            task_id: task_id.into(),
            new_parent_id: new_parent_id.into(),
        }
    }

    /// Create a depth exceeded error
    pub fn depth_exceeded(
        task_id: impl Into<String>,
        attempted_depth: usize,
        max_depth: usize,
    ) -> Self {
        Self::DepthExceeded {
            task_id: task_id.into(),
            attempted_depth,
            max_depth,
        }
    }

    /// Create a root deletion forbidden error
    pub fn root_deletion_forbidden(root_id: impl Into<String>) -> Self {
        Self::RootDeletionForbidden {
            root_id: root_id.into(),
        }
    }

    /// Create a root immutable error
    pub fn root_immutable(root_id: impl Into<String>) -> Self {
        Self::RootImmutable {
            root_id: root_id.into(),
        }
    }

    /// Create a task not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::EntityNotFound { id: id.into() }
    }

    /// Create a children exist error
    pub fn children_exist(id: impl Into<String>, child_count: usize) -> Self {
        Self::ChildrenExist {
            id: id.into(),
            child_count,
        }
    }

    /// Stable machine-readable code, used as the `code` of HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::ParentNotFound { .. } => "PARENT_NOT_FOUND",
            Self::CycleError { .. } => "CYCLE_ERROR",
            Self::DepthExceeded { .. } => "DEPTH_EXCEEDED",
            Self::RootDeletionForbidden { .. } => "ROOT_DELETION_FORBIDDEN",
            Self::RootImmutable { .. } => "ROOT_IMMUTABLE",
            Self::EntityNotFound { .. } => "ENTITY_NOT_FOUND",
            Self::ChildrenExist { .. } => "CHILDREN_EXIST",
            Self::ValidationFailed(_) => "VALIDATION_ERROR",
            Self::StoreError(_) => "STORE_ERROR",
        }
    }
}

/// Result alias for task service operations
pub type TaskResult<T> = Result<T, TaskServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_messages() {
        let err = TaskServiceError::depth_exceeded("t-1", 5, 4);
        assert_eq!(err.code(), "DEPTH_EXCEEDED");
        assert_eq!(
            err.to_string(),
            "Task t-1 would reach depth 5 (maximum 4)"
        );

        let err: TaskServiceError = ValidationError::MissingField("title".to_string()).into();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err: TaskServiceError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.code(), "STORE_ERROR");
        assert!(err.to_string().contains("disk full"));
    }
}
