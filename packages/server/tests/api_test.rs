//! HTTP API tests
//!
//! Drives the router with `oneshot` requests over an in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tasktree_core::db::InMemoryTaskStore;
use tasktree_core::{DeletePolicy, TaskService, TreeConfig, DEFAULT_ROOT_ID};
use tasktree_server::{create_router, AppState, ServerConfig};
use tower::ServiceExt;

async fn test_app_with(config: TreeConfig) -> Router {
    let store = Arc::new(InMemoryTaskStore::new());
    let service = TaskService::new(store, config);
    service
        .ensure_root()
        .await
        .expect("root sentinel should be created");
    create_router(AppState::new(service), &ServerConfig::default())
}

async fn test_app() -> Router {
    test_app_with(TreeConfig::default()).await
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> axum::response::Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

/// POST /tasks and return the created task
async fn create(app: &Router, body: Value) -> Value {
    let response = send(app, "POST", "/tasks", Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

fn id_of(task: &Value) -> String {
    task["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app().await;
    let response = send(&app, "GET", "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn create_defaults_to_root_parent() {
    let app = test_app().await;

    let a = create(&app, json!({"title": "A"})).await;
    let b = create(&app, json!({"title": "B", "priority": "high"})).await;

    assert_eq!(a["parentId"], DEFAULT_ROOT_ID);
    assert_eq!(a["path"], json!([DEFAULT_ROOT_ID, id_of(&a)]));
    assert_eq!(a["order"], 0);
    assert_eq!(b["order"], 1);
    assert_eq!(b["priority"], "high");
    assert_eq!(b["status"], "todo");
}

#[tokio::test]
async fn create_with_unknown_parent_is_not_found() {
    let app = test_app().await;
    let response = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({"title": "Orphan", "parentId": "nope"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "PARENT_NOT_FOUND");
}

#[tokio::test]
async fn create_with_blank_title_is_bad_request() {
    let app = test_app().await;
    let response = send(&app, "POST", "/tasks", Some(json!({"title": "   "}))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn create_beyond_max_depth_is_rejected() {
    let app = test_app().await;
    let a = create(&app, json!({"title": "A"})).await;
    let b = create(&app, json!({"title": "B", "parentId": id_of(&a)})).await;
    let c = create(&app, json!({"title": "C", "parentId": id_of(&b)})).await;
    assert_eq!(c["path"].as_array().unwrap().len(), 4);

    let response = send(
        &app,
        "POST",
        "/tasks",
        Some(json!({"title": "D", "parentId": id_of(&c)})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "DEPTH_EXCEEDED");
}

#[tokio::test]
async fn get_task_returns_nested_subtree() {
    let app = test_app().await;
    let a = create(&app, json!({"title": "A"})).await;
    let a2 = create(&app, json!({"title": "A2", "parentId": id_of(&a), "order": 5})).await;
    let a1 = create(&app, json!({"title": "A1", "parentId": id_of(&a), "order": 1})).await;
    create(&app, json!({"title": "A1a", "parentId": id_of(&a1)})).await;

    let response = send(&app, "GET", &format!("/tasks/{}", id_of(&a)), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let tree = json_body(response).await;

    assert_eq!(tree["title"], "A");
    let children = tree["children"].as_array().unwrap();
    assert_eq!(children[0]["id"], a1["id"]);
    assert_eq!(children[1]["id"], a2["id"]);
    assert_eq!(children[0]["children"][0]["title"], "A1a");
}

#[tokio::test]
async fn get_unknown_task_is_not_found() {
    let app = test_app().await;

    let response = send(&app, "GET", "/tasks/missing", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["code"], "ENTITY_NOT_FOUND");
    assert!(body["message"].as_str().unwrap().contains("missing"));

    let response = send(&app, "GET", "/tasks/missing/children", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn children_are_ordered() {
    let app = test_app().await;
    create(&app, json!({"title": "second", "order": 2})).await;
    create(&app, json!({"title": "first", "order": 0})).await;

    let response = send(&app, "GET", &format!("/tasks/{}/children", DEFAULT_ROOT_ID), None).await;
    let children = json_body(response).await;
    let titles: Vec<&str> = children
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["first", "second"]);
}

#[tokio::test]
async fn list_filters_top_level_tasks() {
    let app = test_app().await;
    let release = create(
        &app,
        json!({"title": "Release", "tags": ["release"], "status": "inProgress"}),
    )
    .await;
    create(&app, json!({"title": "Checklist", "parentId": id_of(&release)})).await;
    create(&app, json!({"title": "Refactor", "tags": ["backend"]})).await;

    let response = send(&app, "GET", "/tasks?status=inProgress&tags=release,docs", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let trees = json_body(response).await;
    let trees = trees.as_array().unwrap();
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0]["title"], "Release");
    // descendants come back unfiltered
    assert_eq!(trees[0]["children"][0]["title"], "Checklist");

    let response = send(&app, "GET", "/tasks", None).await;
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn list_with_bad_query_is_bad_request() {
    let app = test_app().await;

    let response = send(&app, "GET", "/tasks?priority=whenever", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");

    let response = send(
        &app,
        "GET",
        "/tasks?startDate=2026-05-01T00:00:00Z&endDate=2026-04-01T00:00:00Z",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_QUERY");
}

#[tokio::test]
async fn patch_updates_fields() {
    let app = test_app().await;
    let a = create(&app, json!({"title": "A", "description": "draft"})).await;

    let response = send(
        &app,
        "PATCH",
        &format!("/tasks/{}", id_of(&a)),
        Some(json!({"status": "completed", "description": null})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let updated = json_body(response).await;
    assert_eq!(updated["status"], "completed");
    assert!(updated.get("description").map_or(true, Value::is_null));
    assert_eq!(updated["title"], "A");
}

#[tokio::test]
async fn patch_parent_moves_subtree() {
    let app = test_app().await;
    let a = create(&app, json!({"title": "A"})).await;
    let b = create(&app, json!({"title": "B"})).await;
    let b1 = create(&app, json!({"title": "B1", "parentId": id_of(&b)})).await;

    let response = send(
        &app,
        "PATCH",
        &format!("/tasks/{}", id_of(&b)),
        Some(json!({"parentId": id_of(&a)})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", &format!("/tasks/{}", id_of(&b1)), None).await;
    let moved = json_body(response).await;
    assert_eq!(
        moved["path"],
        json!([DEFAULT_ROOT_ID, id_of(&a), id_of(&b), id_of(&b1)])
    );
}

#[tokio::test]
async fn patch_into_own_subtree_is_conflict() {
    let app = test_app().await;
    let a = create(&app, json!({"title": "A"})).await;
    let b = create(&app, json!({"title": "B", "parentId": id_of(&a)})).await;

    let response = send(
        &app,
        "PATCH",
        &format!("/tasks/{}", id_of(&a)),
        Some(json!({"parentId": id_of(&b)})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "CYCLE_ERROR");

    let response = send(&app, "GET", &format!("/tasks/{}", id_of(&a)), None).await;
    assert_eq!(json_body(response).await["parentId"], DEFAULT_ROOT_ID);
}

#[tokio::test]
async fn root_is_protected() {
    let app = test_app().await;

    let response = send(&app, "DELETE", &format!("/tasks/{}", DEFAULT_ROOT_ID), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "ROOT_DELETION_FORBIDDEN");

    let response = send(
        &app,
        "PATCH",
        &format!("/tasks/{}", DEFAULT_ROOT_ID),
        Some(json!({"title": "renamed"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "ROOT_IMMUTABLE");
}

#[tokio::test]
async fn delete_cascades_by_default() {
    let app = test_app().await;
    let a = create(&app, json!({"title": "A"})).await;
    let a1 = create(&app, json!({"title": "A1", "parentId": id_of(&a)})).await;

    let response = send(&app, "DELETE", &format!("/tasks/{}", id_of(&a)), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", &format!("/tasks/{}", id_of(&a1)), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_with_reject_policy_conflicts() {
    let app = test_app_with(TreeConfig::default().with_delete_policy(DeletePolicy::Reject)).await;
    let a = create(&app, json!({"title": "A"})).await;
    create(&app, json!({"title": "A1", "parentId": id_of(&a)})).await;

    let response = send(&app, "DELETE", &format!("/tasks/{}", id_of(&a)), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "CHILDREN_EXIST");
}
