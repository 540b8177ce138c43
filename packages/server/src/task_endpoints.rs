//! Task endpoints
//!
//! CRUD and tree reads over `TaskService`. Structural rules (cycles, depth,
//! sibling order, sentinel protection) live in the service; handlers only
//! translate between HTTP and the service API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tasktree_core::{Task, TaskFilter, TaskInput, TaskPatch, TaskTree};

use crate::{AppState, HttpError};

/// Query string of `GET /tasks`
///
/// `status` and `priority` take the camelCase wire names, `tags` is a
/// comma-separated list.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub tags: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_urgent: Option<bool>,
    pub is_blocked: Option<bool>,
}

impl TryFrom<ListTasksQuery> for TaskFilter {
    type Error = HttpError;

    fn try_from(query: ListTasksQuery) -> Result<Self, Self::Error> {
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(HttpError::invalid_query(format!(
                    "startDate {} is after endDate {}",
                    start, end
                )));
            }
        }

        let mut filter = TaskFilter {
            search: query.search.filter(|s| !s.trim().is_empty()),
            start_date: query.start_date,
            end_date: query.end_date,
            is_urgent: query.is_urgent,
            is_blocked: query.is_blocked,
            ..Default::default()
        };
        if let Some(status) = query.status {
            filter.status = Some(status.parse()?);
        }
        if let Some(priority) = query.priority {
            filter.priority = Some(priority.parse()?);
        }
        if let Some(tags) = query.tags {
            filter.tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(filter)
    }
}

/// Health check endpoint
///
/// ```bash
/// curl http://localhost:3001/health
/// ```
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create a task
///
/// `parentId` defaults to the root sentinel; `order` defaults to the next
/// free slot among the new siblings.
///
/// ```bash
/// curl -X POST http://localhost:3001/tasks \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Write release notes", "priority": "high"}'
/// ```
async fn create_task(
    State(state): State<AppState>,
    Json(input): Json<TaskInput>,
) -> Result<(StatusCode, Json<Task>), HttpError> {
    let task = state.service.create_task(input).await?;
    tracing::debug!("Created task {} at {:?}", task.id, task.path);
    Ok((StatusCode::CREATED, Json(task)))
}

/// Top-level tasks matching the query, each with its subtree
///
/// ```bash
/// curl 'http://localhost:3001/tasks?status=todo&tags=backend,release'
/// ```
async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<TaskTree>>, HttpError> {
    let filter = TaskFilter::try_from(query)?;
    let trees = state.service.list_tasks(&filter).await?;
    Ok(Json(trees))
}

/// A task with its full subtree under `children`
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskTree>, HttpError> {
    let tree = state.service.get_task_tree(&id).await?;
    Ok(Json(tree))
}

/// Direct children ordered by `order`
async fn get_children(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Task>>, HttpError> {
    let children = state.service.get_children(&id).await?;
    Ok(Json(children))
}

/// Partially update a task
///
/// A `parentId` different from the current parent moves the task and its
/// subtree.
///
/// ```bash
/// curl -X PATCH http://localhost:3001/tasks/<id> \
///   -H "Content-Type: application/json" \
///   -d '{"status": "completed"}'
/// ```
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, HttpError> {
    let task = state.service.update_task(&id, patch).await?;
    tracing::debug!("Updated task {}", id);
    Ok(Json(task))
}

/// Delete a task according to the configured delete policy
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    let result = state.service.delete_task(&id).await?;
    tracing::debug!("Deleted {} task(s) starting at {}", result.removed.len(), id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/:id/children", get(get_children))
        .with_state(state)
}
