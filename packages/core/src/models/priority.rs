//! Priority scoring heuristic
//!
//! Derives a 0–100 score for a task from its declared priority, due date,
//! progress and blocked flag, then maps the score back to a priority level.

use crate::models::{Task, TaskPriority};
use chrono::{DateTime, Utc};

/// Points lost per day of remaining time
const POINTS_PER_DAY: f64 = 20.0;

/// Penalty applied to blocked tasks
const BLOCKED_PENALTY: f64 = 20.0;

/// Base score for a declared priority level
pub fn base_score(priority: TaskPriority) -> f64 {
    match priority {
        TaskPriority::Urgent => 100.0,
        TaskPriority::High => 80.0,
        TaskPriority::Medium => 60.0,
        TaskPriority::Low => 40.0,
        TaskPriority::Minimal => 20.0,
    }
}

/// Hours until the due date, `None` when the task has no due date.
///
/// Overdue tasks report zero.
pub fn remaining_hours(task: &Task, now: DateTime<Utc>) -> Option<f64> {
    task.due_date.map(|due| {
        let millis = (due - now).num_milliseconds() as f64;
        (millis / 3_600_000.0).max(0.0)
    })
}

/// Percentage of estimated hours already spent; 0 when either is unknown.
pub fn progress(task: &Task) -> f64 {
    match (task.estimated_hours, task.actual_hours) {
        (Some(estimated), Some(actual)) if estimated > 0.0 && actual > 0.0 => {
            actual / estimated * 100.0
        }
        _ => 0.0,
    }
}

/// Compute the priority score of a task at `now`, clamped to `0..=100`.
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use tasktree_core::models::{calculate_priority_score, Task, DEFAULT_ROOT_ID};
///
/// let mut task = Task::root(DEFAULT_ROOT_ID);
/// task.is_root = false;
/// let score = calculate_priority_score(&task, Utc::now());
/// assert!((0.0..=100.0).contains(&score));
/// ```
pub fn calculate_priority_score(task: &Task, now: DateTime<Utc>) -> f64 {
    let mut score = base_score(task.priority);

    if let Some(hours) = remaining_hours(task, now) {
        score += (100.0 - hours / 24.0 * POINTS_PER_DAY).max(0.0);
    }

    score += (100.0 - progress(task)) * 0.5;

    if task.is_blocked {
        score -= BLOCKED_PENALTY;
    }

    score.clamp(0.0, 100.0)
}

/// Map a score to the priority level it falls into.
pub fn determine_priority(score: f64) -> TaskPriority {
    if score >= 90.0 {
        TaskPriority::Urgent
    } else if score >= 70.0 {
        TaskPriority::High
    } else if score >= 50.0 {
        TaskPriority::Medium
    } else if score >= 30.0 {
        TaskPriority::Low
    } else {
        TaskPriority::Minimal
    }
}

impl Task {
    /// Recompute `priority_score`, `priority` and `is_urgent` at `now`.
    pub fn refresh_priority(&mut self, now: DateTime<Utc>) {
        let score = calculate_priority_score(self, now);
        self.priority_score = score;
        self.priority = determine_priority(score);
        self.is_urgent = self.priority == TaskPriority::Urgent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskInput, DEFAULT_ROOT_ID};
    use chrono::Duration;

    fn task(priority: TaskPriority) -> Task {
        let root = Task::root(DEFAULT_ROOT_ID);
        Task::from_input(
            TaskInput::new("scored").with_priority(priority),
            root.id.clone(),
            &root.path,
            0,
        )
    }

    #[test]
    fn test_determine_priority_thresholds() {
        assert_eq!(determine_priority(95.0), TaskPriority::Urgent);
        assert_eq!(determine_priority(90.0), TaskPriority::Urgent);
        assert_eq!(determine_priority(70.0), TaskPriority::High);
        assert_eq!(determine_priority(50.0), TaskPriority::Medium);
        assert_eq!(determine_priority(30.0), TaskPriority::Low);
        assert_eq!(determine_priority(29.9), TaskPriority::Minimal);
    }

    #[test]
    fn test_score_is_clamped() {
        let now = Utc::now();
        let mut t = task(TaskPriority::Urgent);
        t.due_date = Some(now - Duration::hours(5));
        assert_eq!(calculate_priority_score(&t, now), 100.0);

        let mut t = task(TaskPriority::Minimal);
        t.estimated_hours = Some(1.0);
        t.actual_hours = Some(10.0);
        t.is_blocked = true;
        assert_eq!(calculate_priority_score(&t, now), 0.0);
    }

    #[test]
    fn test_progress_and_block_penalty() {
        let now = Utc::now();
        let mut t = task(TaskPriority::Low);
        // 40 base + (100 - 50) * 0.5
        t.estimated_hours = Some(10.0);
        t.actual_hours = Some(5.0);
        assert_eq!(calculate_priority_score(&t, now), 65.0);

        t.is_blocked = true;
        assert_eq!(calculate_priority_score(&t, now), 45.0);
    }

    #[test]
    fn test_far_due_date_adds_nothing() {
        let now = Utc::now();
        let mut t = task(TaskPriority::Minimal);
        t.estimated_hours = Some(4.0);
        t.actual_hours = Some(4.0);
        t.due_date = Some(now + Duration::days(30));
        assert_eq!(calculate_priority_score(&t, now), 20.0);
    }

    #[test]
    fn test_refresh_priority_sets_urgent_flag() {
        let now = Utc::now();
        let mut t = task(TaskPriority::High);
        t.due_date = Some(now + Duration::hours(1));
        t.refresh_priority(now);

        assert_eq!(t.priority, TaskPriority::Urgent);
        assert!(t.is_urgent);
        assert_eq!(t.priority_score, 100.0);
    }
}
