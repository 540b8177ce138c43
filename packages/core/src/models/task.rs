//! Task Data Structures
//!
//! This module defines the `Task` entity stored by the task repository together
//! with the input/patch types used to create and edit tasks.
//!
//! # Architecture
//!
//! - **Materialized Path**: every task caches its ancestor chain in `path`
//!   (sentinel first, the task itself last). `path.len()` is the task depth.
//! - **Root Sentinel**: a single synthetic task with a well-known id acts as the
//!   parent of all top-level tasks, so there is no null-parent special case.
//! - **Sibling Order**: `order` ranks a task among tasks sharing its `parent_id`.
//!   Values are unique within a sibling group but may have gaps.
//!
//! # Examples
//!
//! ```rust
//! use tasktree_core::models::{Task, TaskInput, TaskStatus};
//!
//! let input = TaskInput::new("Write release notes").with_status(TaskStatus::InProgress);
//! assert!(input.validate().is_ok());
//!
//! let root = Task::root("00000000-0000-0000-0000-000000000000");
//! assert!(root.is_root);
//! assert_eq!(root.depth(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Well-known id of the root sentinel used when no other id is configured.
pub const DEFAULT_ROOT_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Title given to the root sentinel. Never displayed.
pub const ROOT_TITLE: &str = "__root__";

/// Validation errors for task field values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Order {order} is already used by sibling '{sibling_id}'")]
    OrderTaken { order: i64, sibling_id: String },
}

impl ValidationError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Lifecycle status of a task
///
/// Transitions are unrestricted: any status can move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    /// Not started (default)
    #[default]
    Todo,
    /// Being worked on
    #[serde(alias = "in-progress", alias = "in_progress")]
    InProgress,
    /// Done
    Completed,
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "inProgress" | "in-progress" | "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(ValidationError::invalid_value(
                "status",
                format!("unknown status '{}'", s),
            )),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::InProgress => write!(f, "inProgress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Task priority, ordered from most to least pressing
///
/// The derived `Ord` follows declaration order, so `Urgent < Minimal`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum TaskPriority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
    Minimal,
}

impl FromStr for TaskPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "urgent" => Ok(Self::Urgent),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "minimal" => Ok(Self::Minimal),
            _ => Err(ValidationError::invalid_value(
                "priority",
                format!("unknown priority '{}'", s),
            )),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Minimal => "minimal",
        };
        write!(f, "{}", name)
    }
}

/// A task stored in the repository.
///
/// # Fields
///
/// - `id`: UUID string (the sentinel uses a configured well-known id)
/// - `parent_id`: structural parent, `None` only for the sentinel
/// - `path`: ancestor ids from the sentinel down to and including `id`
/// - `order`: rank among siblings (unique per `parent_id`, gaps allowed)
/// - `dependencies`: advisory links to other tasks, not part of the tree
///
/// Children are never stored on the task. They are assembled on read into
/// [`TaskTree`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    /// Numeric priority in `0..=100`
    #[serde(default)]
    pub priority_score: f64,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub estimated_hours: Option<f64>,

    #[serde(default)]
    pub actual_hours: Option<f64>,

    #[serde(default)]
    pub is_urgent: bool,

    #[serde(default)]
    pub is_blocked: bool,

    pub parent_id: Option<String>,

    pub path: Vec<String>,

    pub order: i64,

    #[serde(default)]
    pub is_root: bool,

    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build the root sentinel for the given id.
    pub fn root(root_id: impl Into<String>) -> Self {
        let id = root_id.into();
        let now = Utc::now();
        Self {
            path: vec![id.clone()],
            id,
            title: ROOT_TITLE.to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            priority_score: 0.0,
            due_date: None,
            tags: BTreeSet::new(),
            estimated_hours: None,
            actual_hours: None,
            is_urgent: false,
            is_blocked: false,
            parent_id: None,
            order: 0,
            is_root: true,
            dependencies: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a new (not yet persisted) task from validated input.
    ///
    /// A fresh UUID is generated. `path` and `order` are assigned by the
    /// caller, which is the only place that knows the parent and siblings.
    pub fn from_input(input: TaskInput, parent_id: String, path_prefix: &[String], order: i64) -> Self {
        let id = Uuid::new_v4().to_string();
        let mut path = path_prefix.to_vec();
        path.push(id.clone());
        let now = Utc::now();

        Self {
            id,
            title: input.title.trim().to_string(),
            description: input.description,
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            priority_score: input.priority_score.unwrap_or(0.0),
            due_date: input.due_date,
            tags: input.tags,
            estimated_hours: input.estimated_hours,
            actual_hours: input.actual_hours,
            is_urgent: input.is_urgent.unwrap_or(false),
            is_blocked: input.is_blocked.unwrap_or(false),
            parent_id: Some(parent_id),
            path,
            order,
            is_root: false,
            dependencies: input.dependencies,
            created_at: now,
            updated_at: now,
        }
    }

    /// Depth of the task (`path.len()`, sentinel = 1)
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Form data of this task, as a client would submit it to recreate it.
    pub fn to_input(&self) -> TaskInput {
        TaskInput {
            title: self.title.clone(),
            description: self.description.clone(),
            status: Some(self.status),
            priority: Some(self.priority),
            priority_score: Some(self.priority_score),
            due_date: self.due_date,
            tags: self.tags.clone(),
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            is_urgent: Some(self.is_urgent),
            is_blocked: Some(self.is_blocked),
            parent_id: self.parent_id.clone(),
            order: Some(self.order),
            dependencies: self.dependencies.clone(),
        }
    }

    /// Apply every non-structural field of a patch.
    ///
    /// `parent_id` and `order` are ignored here: they go through the tree
    /// checks in the service.
    pub fn apply_fields(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(score) = patch.priority_score {
            self.priority_score = score;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(hours) = patch.estimated_hours {
            self.estimated_hours = hours;
        }
        if let Some(hours) = patch.actual_hours {
            self.actual_hours = hours;
        }
        if let Some(flag) = patch.is_urgent {
            self.is_urgent = flag;
        }
        if let Some(flag) = patch.is_blocked {
            self.is_blocked = flag;
        }
        if let Some(dependencies) = &patch.dependencies {
            self.dependencies = dependencies.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Data submitted to create a task (the "form data" of a task).
///
/// Everything except `title` is optional. `parent_id` defaults to the root
/// sentinel and `order` to the end of the sibling list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_urgent: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_blocked: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,

    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

impl TaskInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check field values. Structural checks (parent, depth) live in the service.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_score(self.priority_score)?;
        validate_hours("estimatedHours", self.estimated_hours)?;
        validate_hours("actualHours", self.actual_hours)?;
        if let Some(order) = self.order {
            validate_order(order)?;
        }
        Ok(())
    }
}

/// Partial update of a task.
///
/// Uses the double-Option pattern for clearable fields:
/// - `None`: don't change the field
/// - `Some(None)`: clear the field
/// - `Some(Some(v))`: set the field to `v`
///
/// A `parent_id` that differs from the current parent turns the update into a
/// move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub description: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<f64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub estimated_hours: Option<Option<f64>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub actual_hours: Option<Option<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_urgent: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_blocked: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<BTreeSet<String>>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Patch that sets every field of a task back to the given form data.
    ///
    /// Used by undo/redo to restore a snapshot, including its parent and
    /// sibling order.
    pub fn restore(input: &TaskInput) -> Self {
        Self {
            title: Some(input.title.clone()),
            description: Some(input.description.clone()),
            status: input.status,
            priority: input.priority,
            priority_score: input.priority_score,
            due_date: Some(input.due_date),
            tags: Some(input.tags.clone()),
            estimated_hours: Some(input.estimated_hours),
            actual_hours: Some(input.actual_hours),
            is_urgent: input.is_urgent,
            is_blocked: input.is_blocked,
            parent_id: input.parent_id.clone(),
            order: input.order,
            dependencies: Some(input.dependencies.clone()),
        }
    }

    /// Check if the patch contains any changes
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_score(self.priority_score)?;
        validate_hours("estimatedHours", self.estimated_hours.flatten())?;
        validate_hours("actualHours", self.actual_hours.flatten())?;
        if let Some(order) = self.order {
            validate_order(order)?;
        }
        Ok(())
    }
}

/// A task with its nested children, as returned by tree reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTree {
    #[serde(flatten)]
    pub task: Task,

    #[serde(default)]
    pub children: Vec<TaskTree>,
}

impl TaskTree {
    pub fn leaf(task: Task) -> Self {
        Self {
            task,
            children: Vec::new(),
        }
    }

    /// Number of tasks in this tree, including the top task
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TaskTree::len).sum::<usize>()
    }

    /// A tree always holds at least its top task
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Depth-first iterator over every task in the tree
    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let tree = stack.pop()?;
            stack.extend(tree.children.iter().rev());
            Some(&tree.task)
        })
    }
}

/// Result of a delete operation
///
/// `removed` holds the deleted task first, followed by any descendants deleted
/// with it (parents always before their children).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub removed: Vec<Task>,
}

impl DeleteResult {
    pub fn ids(&self) -> Vec<String> {
        self.removed.iter().map(|t| t.id.clone()).collect()
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::MissingField("title".to_string()));
    }
    Ok(())
}

fn validate_score(score: Option<f64>) -> Result<(), ValidationError> {
    match score {
        Some(s) if !(0.0..=100.0).contains(&s) => Err(ValidationError::invalid_value(
            "priorityScore",
            format!("{} is outside 0..=100", s),
        )),
        _ => Ok(()),
    }
}

fn validate_hours(field: &str, hours: Option<f64>) -> Result<(), ValidationError> {
    match hours {
        Some(h) if h < 0.0 || h.is_nan() => Err(ValidationError::invalid_value(
            field,
            format!("{} must not be negative", h),
        )),
        _ => Ok(()),
    }
}

fn validate_order(order: i64) -> Result<(), ValidationError> {
    if order < 0 {
        return Err(ValidationError::invalid_value(
            "order",
            format!("{} must not be negative", order),
        ));
    }
    Ok(())
}

/// Distinguish an absent field from an explicit `null` in patches.
fn deserialize_optional_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

#[cfg(test)]
#[path = "task_test.rs"]
mod task_test;
