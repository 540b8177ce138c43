//! Task filter for listing queries
//!
//! Mirrors the query parameters of `GET /tasks`. A filter selects top-level
//! tasks; their descendants are always returned in full.

use crate::models::{Task, TaskPriority, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filter for task listing
///
/// # Examples
///
/// ```rust
/// # use tasktree_core::models::{TaskFilter, TaskStatus};
/// let filter = TaskFilter::new()
///     .with_status(TaskStatus::Todo)
///     .with_search("release");
/// assert!(!filter.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,

    /// Matches tasks carrying at least one of these tags
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Case-insensitive substring of title or description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Lower bound (inclusive) on the due date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    /// Upper bound (inclusive) on the due date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_urgent: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_blocked: Option<bool>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_due_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check whether a single task satisfies every criterion of the filter.
    ///
    /// A date bound excludes tasks without a due date.
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if !self.tags.is_empty() && self.tags.is_disjoint(&task.tags) {
            return false;
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if !task.due_date.is_some_and(|due| due >= start) {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if !task.due_date.is_some_and(|due| due <= end) {
                return false;
            }
        }
        if self.is_urgent.is_some_and(|flag| flag != task.is_urgent) {
            return false;
        }
        if self.is_blocked.is_some_and(|flag| flag != task.is_blocked) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskInput, DEFAULT_ROOT_ID};
    use chrono::Duration;

    fn task(input: TaskInput) -> Task {
        let root = Task::root(DEFAULT_ROOT_ID);
        Task::from_input(input, root.id.clone(), &root.path, 0)
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = TaskFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&task(TaskInput::new("anything"))));
    }

    #[test]
    fn test_search_is_case_insensitive_over_title_and_description() {
        let filter = TaskFilter::new().with_search("RELEASE");

        assert!(filter.matches(&task(TaskInput::new("Prepare release"))));
        assert!(filter.matches(&task(
            TaskInput::new("Notes").with_description("for the next release")
        )));
        assert!(!filter.matches(&task(TaskInput::new("Unrelated"))));
    }

    #[test]
    fn test_tags_match_any() {
        let filter = TaskFilter::new().with_tag("work").with_tag("home");

        assert!(filter.matches(&task(TaskInput::new("a").with_tags(["home"]))));
        assert!(!filter.matches(&task(TaskInput::new("b").with_tags(["errands"]))));
        assert!(!filter.matches(&task(TaskInput::new("c"))));
    }

    #[test]
    fn test_due_range_excludes_undated_tasks() {
        let now = Utc::now();
        let filter = TaskFilter::new().with_due_range(Some(now), Some(now + Duration::days(7)));

        let mut dated = task(TaskInput::new("dated"));
        dated.due_date = Some(now + Duration::days(1));
        assert!(filter.matches(&dated));

        dated.due_date = Some(now + Duration::days(8));
        assert!(!filter.matches(&dated));

        assert!(!filter.matches(&task(TaskInput::new("undated"))));
    }

    #[test]
    fn test_status_and_flags() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Completed),
            is_blocked: Some(false),
            ..Default::default()
        };

        assert!(filter.matches(&task(
            TaskInput::new("done").with_status(TaskStatus::Completed)
        )));
        assert!(!filter.matches(&task(TaskInput::new("todo"))));
    }
}
