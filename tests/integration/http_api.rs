//! Integration tests for the HTTP API.
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot` and
//! checks status codes, the response envelope, and that references stay
//! consistent when every change goes through the API.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use taskboard::{Board, MemoryStore};
use taskboard_server::server::{AppState, router};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn test_router() -> Router {
    let board = Board::new(Arc::new(MemoryStore::new()));
    router(Arc::new(AppState::new(board)))
}

async fn request(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send(router, req).await
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_user(router: &Router, name: &str) -> Value {
    let (status, body) = request(
        router,
        Method::POST,
        "/api/users",
        Some(json!({ "name": name, "email": format!("{name}@example.org") })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

async fn create_task(router: &Router, name: &str, assignee: &str) -> Value {
    let (status, body) = request(
        router,
        Method::POST,
        "/api/tasks",
        Some(json!({
            "name": name,
            "deadline": "2026-12-31T00:00:00Z",
            "assignedUser": assignee,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

async fn get_data(router: &Router, uri: &str) -> Value {
    let (status, body) = request(router, Method::GET, uri, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"].clone()
}

fn id(doc: &Value) -> &str {
    doc["id"].as_str().unwrap()
}

// ---------------------------------------------------------------------------
// Basic CRUD and envelope
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check() {
    let router = test_router();
    let (status, body) = request(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn create_task_returns_created_envelope() {
    let router = test_router();
    let task = create_task(&router, "write report", "").await;

    assert_eq!(task["name"], "write report");
    assert_eq!(task["description"], "");
    assert_eq!(task["completed"], false);
    assert_eq!(task["assignedUser"], "");
    assert_eq!(task["assignedUserName"], "unassigned");
    assert!(task["dateCreated"].is_string());

    let (status, body) = request(&router, Method::GET, "/api/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OK");
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn count_query_returns_number() {
    let router = test_router();
    create_user(&router, "ada").await;
    create_user(&router, "bea").await;

    assert_eq!(get_data(&router, "/api/users?count=true").await, json!(2));
    assert_eq!(get_data(&router, "/api/tasks?count=true").await, json!(0));
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let router = test_router();
    let (status, body) = request(
        &router,
        Method::POST,
        "/api/tasks",
        Some(json!({ "description": "no name" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "message": "Task must include name and deadline", "data": null })
    );

    let (status, body) = request(
        &router,
        Method::POST,
        "/api/users",
        Some(json!({ "name": "ada", "email": "not-an-email" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is invalid");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let router = test_router();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/tasks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = send(&router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let router = test_router();

    let (status, body) = request(&router, Method::GET, "/api/tasks/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Task not found", "data": null }));

    let (status, body) = request(&router, Method::DELETE, "/api/users/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (status, _) = request(
        &router,
        Method::PUT,
        "/api/tasks/nope",
        Some(json!({ "name": "x", "deadline": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_email_is_bad_request() {
    let router = test_router();
    create_user(&router, "ada").await;

    let (status, body) = request(
        &router,
        Method::POST,
        "/api/users",
        Some(json!({ "name": "Other Ada", "email": "ADA@example.org" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "A user with this email already exists");
    assert_eq!(get_data(&router, "/api/users?count=true").await, json!(1));
}

// ---------------------------------------------------------------------------
// Reference consistency through the API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn task_lifecycle_keeps_pending_tasks_in_sync() {
    let router = test_router();
    let u1 = create_user(&router, "ada").await;
    let u2 = create_user(&router, "bea").await;
    let t1 = create_task(&router, "T1", id(&u1)).await;
    assert_eq!(t1["assignedUserName"], "ada");

    let u1_uri = format!("/api/users/{}", id(&u1));
    let u2_uri = format!("/api/users/{}", id(&u2));
    let t1_uri = format!("/api/tasks/{}", id(&t1));
    assert_eq!(get_data(&router, &u1_uri).await["pendingTasks"], json!([id(&t1)]));

    // Reassign.
    let (status, body) = request(
        &router,
        Method::PUT,
        &t1_uri,
        Some(json!({ "name": "T1", "deadline": 1_800_000_000_000_i64, "assignedUser": id(&u2) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["assignedUserName"], "bea");
    assert_eq!(get_data(&router, &u1_uri).await["pendingTasks"], json!([]));
    assert_eq!(get_data(&router, &u2_uri).await["pendingTasks"], json!([id(&t1)]));

    // Complete.
    request(
        &router,
        Method::PUT,
        &t1_uri,
        Some(json!({
            "name": "T1",
            "deadline": 1_800_000_000_000_i64,
            "assignedUser": id(&u2),
            "completed": true,
        })),
    )
    .await;
    assert_eq!(get_data(&router, &u2_uri).await["pendingTasks"], json!([]));

    // Delete.
    let (status, body) = request(&router, Method::DELETE, &t1_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted");
    assert_eq!(body["data"]["id"], id(&t1));
}

#[tokio::test]
async fn deleting_user_unassigns_tasks() {
    let router = test_router();
    let u1 = create_user(&router, "ada").await;
    let t1 = create_task(&router, "T1", id(&u1)).await;

    let (status, body) =
        request(&router, Method::DELETE, &format!("/api/users/{}", id(&u1)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted");

    let task = get_data(&router, &format!("/api/tasks/{}", id(&t1))).await;
    assert_eq!(task["assignedUser"], "");
    assert_eq!(task["assignedUserName"], "unassigned");
}

#[tokio::test]
async fn user_claiming_task_evicts_previous_owner() {
    let router = test_router();
    let u1 = create_user(&router, "ada").await;
    let u2 = create_user(&router, "bea").await;
    let t1 = create_task(&router, "T1", id(&u1)).await;

    let (status, body) = request(
        &router,
        Method::PUT,
        &format!("/api/users/{}", id(&u2)),
        Some(json!({
            "name": "bea",
            "email": "bea@example.org",
            "pendingTasks": [id(&t1)],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Updated");

    let task = get_data(&router, &format!("/api/tasks/{}", id(&t1))).await;
    assert_eq!(task["assignedUser"], id(&u2));
    assert_eq!(task["assignedUserName"], "bea");
    let u1 = get_data(&router, &format!("/api/users/{}", id(&u1))).await;
    assert_eq!(u1["pendingTasks"], json!([]));
}

#[tokio::test]
async fn dangling_assignee_becomes_unassigned() {
    let router = test_router();
    let task = create_task(&router, "T1", "nonexistent").await;
    assert_eq!(task["assignedUser"], "");
    assert_eq!(task["assignedUserName"], "unassigned");
}

#[tokio::test]
async fn manual_sweep_reports_no_repairs_after_api_traffic() {
    let router = test_router();
    let u1 = create_user(&router, "ada").await;
    create_task(&router, "T1", id(&u1)).await;
    create_task(&router, "T2", "").await;

    let (status, body) = request(&router, Method::POST, "/api/maintenance/sweep", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({ "repairs": 0, "tasksScanned": 2, "usersScanned": 1 })
    );
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let board = Board::new(Arc::new(MemoryStore::new()));
    let router = router(Arc::new(AppState::with_config(board, 128)));
    let (status, _) = request(
        &router,
        Method::POST,
        "/api/tasks",
        Some(json!({ "name": "x".repeat(1024), "deadline": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
