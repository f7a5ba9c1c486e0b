use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use habits_backend::db::services::MemoryHabitStore;
use habits_backend::web::{AppState, create_admin_axum_router, create_axum_router};

fn app_with_admin(store: Arc<MemoryHabitStore>) -> Router {
    create_axum_router(AppState::new(store), true)
}

fn app(store: Arc<MemoryHabitStore>) -> Router {
    create_axum_router(AppState::new(store), false)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_create_then_list_returns_record_intact() {
    let app = app(Arc::new(MemoryHabitStore::new()));
    let habit = json!({
        "userId": "u1",
        "id": 7,
        "text": "meditate",
        "completed": true,
        "dateAdded": "2024-05-01",
        "colorName": "indigo",
        "completionHistory": {"2024-05-01": 1, "2024-05-03": 2}
    });

    let (status, created) = send(&app, Method::POST, "/api/habits", Some(habit.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["_id"].is_number());
    assert!(created["createdAt"].is_string());

    let (status, listed) = send(&app, Method::GET, "/api/habits/u1", None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    for key in ["userId", "id", "text", "completed", "dateAdded", "colorName", "completionHistory"] {
        assert_eq!(listed[0][key], habit[key], "field {key} changed");
    }
}

#[tokio::test]
async fn test_create_without_required_field_is_rejected() {
    let app = app(Arc::new(MemoryHabitStore::new()));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/habits",
        Some(json!({"userId": "u1", "id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "text is required");
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let app = app(Arc::new(MemoryHabitStore::new()));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/habits")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_update_missing_record_returns_null() {
    let app = app(Arc::new(MemoryHabitStore::new()));

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/habits/5",
        Some(json!({"userId": "u1", "text": "nothing here"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_update_sets_supplied_fields_only() {
    let app = app(Arc::new(MemoryHabitStore::new()));
    send(
        &app,
        Method::POST,
        "/api/habits",
        Some(json!({"userId": "u1", "id": 5, "text": "walk", "colorName": "green"})),
    )
    .await;

    let (status, updated) = send(
        &app,
        Method::PUT,
        "/api/habits/5",
        Some(json!({"userId": "u1", "completed": true, "completionHistory": {"2024-06-01": 1}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["text"], "walk");
    assert_eq!(updated["colorName"], "green");
    assert_eq!(updated["completionHistory"]["2024-06-01"], 1);
}

#[tokio::test]
async fn test_update_is_scoped_to_user() {
    let app = app(Arc::new(MemoryHabitStore::new()));
    send(
        &app,
        Method::POST,
        "/api/habits",
        Some(json!({"userId": "u1", "id": 5, "text": "walk"})),
    )
    .await;

    let (_, body) = send(
        &app,
        Method::PUT,
        "/api/habits/5",
        Some(json!({"userId": "u2", "text": "hijacked"})),
    )
    .await;
    assert_eq!(body, Value::Null);

    let (_, listed) = send(&app, Method::GET, "/api/habits/u1", None).await;
    assert_eq!(listed[0]["text"], "walk");
}

#[tokio::test]
async fn test_update_requires_user_id_and_numeric_id() {
    let app = app(Arc::new(MemoryHabitStore::new()));

    let (status, body) = send(&app, Method::PUT, "/api/habits/5", Some(json!({"text": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userId is required");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/habits/five",
        Some(json!({"userId": "u1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "id must be an integer");
}

#[tokio::test]
async fn test_delete_missing_record_still_confirms() {
    let app = app(Arc::new(MemoryHabitStore::new()));

    let (status, body) = send(&app, Method::DELETE, "/api/habits/99/nobody", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Habit deleted"}));
}

#[tokio::test]
async fn test_delete_removes_only_the_keyed_record() {
    let app = app(Arc::new(MemoryHabitStore::new()));
    for (user, id) in [("u1", 1), ("u1", 2), ("u2", 1)] {
        send(
            &app,
            Method::POST,
            "/api/habits",
            Some(json!({"userId": user, "id": id, "text": "x"})),
        )
        .await;
    }

    let (status, _) = send(&app, Method::DELETE, "/api/habits/1/u1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, u1) = send(&app, Method::GET, "/api/habits/u1", None).await;
    let ids: Vec<i64> = u1.as_array().unwrap().iter().map(|h| h["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![2]);
    let (_, u2) = send(&app, Method::GET, "/api/habits/u2", None).await;
    assert_eq!(u2.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sync_replaces_user_records() {
    let app = app(Arc::new(MemoryHabitStore::new()));
    send(
        &app,
        Method::POST,
        "/api/habits",
        Some(json!({"userId": "u1", "id": 42, "text": "stale"})),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/habits/sync",
        Some(json!({"userId": "u1", "habits": [{"id": 1, "text": "run"}, {"id": 2, "text": "read"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["message"], "Habits synced successfully");

    let (_, listed) = send(&app, Method::GET, "/api/habits/u1", None).await;
    let listed = listed.as_array().unwrap();
    let texts: Vec<&str> = listed.iter().map(|h| h["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["run", "read"]);
    assert!(listed.iter().all(|h| h["userId"] == "u1"));
}

#[tokio::test]
async fn test_empty_sync_clears_user() {
    let app = app(Arc::new(MemoryHabitStore::new()));
    send(
        &app,
        Method::POST,
        "/api/habits",
        Some(json!({"userId": "u1", "id": 1, "text": "run"})),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/habits/sync",
        Some(json!({"userId": "u1", "habits": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    let (_, listed) = send(&app, Method::GET, "/api/habits/u1", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_invalid_sync_entry_leaves_existing_records() {
    let app = app(Arc::new(MemoryHabitStore::new()));
    send(
        &app,
        Method::POST,
        "/api/habits",
        Some(json!({"userId": "u1", "id": 1, "text": "run"})),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/habits/sync",
        Some(json!({"userId": "u1", "habits": [{"id": 2}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "habits[0]: text is required");

    let (_, listed) = send(&app, Method::GET, "/api/habits/u1", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_creates_for_disjoint_keys_both_persist() {
    let app = app(Arc::new(MemoryHabitStore::new()));

    let (first, second) = tokio::join!(
        send(
            &app,
            Method::POST,
            "/api/habits",
            Some(json!({"userId": "u1", "id": 1, "text": "a"})),
        ),
        send(
            &app,
            Method::POST,
            "/api/habits",
            Some(json!({"userId": "u1", "id": 2, "text": "b"})),
        ),
    );
    assert_eq!(first.0, StatusCode::CREATED);
    assert_eq!(second.0, StatusCode::CREATED);

    let (_, listed) = send(&app, Method::GET, "/api/habits/u1", None).await;
    let mut ids: Vec<i64> = listed.as_array().unwrap().iter().map(|h| h["id"].as_i64().unwrap()).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_store_failure_is_a_server_error() {
    let store = Arc::new(MemoryHabitStore::new());
    store.set_connected(false);
    let app = app(store);

    let (status, body) = send(&app, Method::GET, "/api/habits/u1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Record store is disconnected");

    let (status, _) = send(&app, Method::DELETE, "/api/habits/1/u1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_health_reports_store_state_without_failing() {
    let store = Arc::new(MemoryHabitStore::new());
    let app = app(store.clone());

    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mongodb"], "connected");
    assert!(body["timestamp"].is_string());

    store.set_connected(false);
    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mongodb"], "disconnected");
}

#[tokio::test]
async fn test_admin_routes_hidden_unless_enabled() {
    let app = app(Arc::new(MemoryHabitStore::new()));
    let (status, _) = send(&app, Method::GET, "/api/admin/all-habits", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_all_habits_is_capped() {
    let app = app_with_admin(Arc::new(MemoryHabitStore::new()));
    let habits: Vec<Value> = (0..120).map(|i| json!({"id": i, "text": "x"})).collect();
    send(
        &app,
        Method::POST,
        "/api/habits/sync",
        Some(json!({"userId": "bulk", "habits": habits})),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/api/admin/all-habits", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 100);
    assert_eq!(body["habits"].as_array().unwrap().len(), 100);
}

#[tokio::test]
async fn test_admin_user_listing() {
    let app = app_with_admin(Arc::new(MemoryHabitStore::new()));
    send(
        &app,
        Method::POST,
        "/api/habits",
        Some(json!({"userId": "u9", "id": 1, "text": "x"})),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/api/admin/user/u9", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], "u9");
    assert_eq!(body["total"], 1);
    assert_eq!(body["habits"][0]["text"], "x");
}

#[tokio::test]
async fn test_dedicated_admin_router() {
    let admin = create_admin_axum_router(AppState::new(Arc::new(MemoryHabitStore::new())));

    let (status, body) = send(&admin, Method::GET, "/api/admin/databases", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["databases"], json!(["memory"]));

    let (status, _) = send(&admin, Method::GET, "/api/habits/u1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_named_sync_can_list_habits() {
    let app = app(Arc::new(MemoryHabitStore::new()));
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/habits",
        Some(json!({"userId": "sync", "id": 1, "text": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, listed) = send(&app, Method::GET, "/api/habits/sync", None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["userId"], "sync");
}

#[tokio::test]
async fn test_out_of_range_id_is_rejected() {
    let store = Arc::new(MemoryHabitStore::new());
    let app = app(store.clone());
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/habits",
        Some(json!({"userId": "u", "id": 1e300, "text": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "id must be an integer");

    let (_, listed) = send(&app, Method::GET, "/api/habits/u", None).await;
    assert_eq!(listed, json!([]));
}
