use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{CONTENT_TYPE, USER_AGENT};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api_services::build_app_state;
use crate::middleware::{ACTOR_ID_HEADER, ACTOR_LABEL_HEADER};

use super::build_router;

fn test_router() -> Router {
    build_router(build_app_state(None), "http://localhost:3000")
        .unwrap_or_else(|_| unreachable!())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|_| unreachable!());
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn create_student_request(data: Value) -> Request<Body> {
    Request::post("/api/entities/students/records")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "data": data }).to_string()))
        .unwrap_or_else(|_| unreachable!())
}

async fn student_audit_log(router: &Router) -> Vec<Value> {
    let request = Request::get("/api/audit-log?entity_type=Student")
        .body(Body::empty())
        .unwrap_or_else(|_| unreachable!());
    let (status, body) = send(router, request).await;
    assert_eq!(status, StatusCode::OK);

    body.as_array().cloned().unwrap_or_default()
}

#[tokio::test]
async fn actor_headers_produce_audited_write() {
    let router = test_router();

    let mut request = create_student_request(json!({"name": "Ana", "grade": 7}));
    let headers = request.headers_mut();
    headers.insert(ACTOR_ID_HEADER, "user-1".parse().unwrap_or_else(|_| unreachable!()));
    headers.insert(
        ACTOR_LABEL_HEADER,
        "Registrar Office".parse().unwrap_or_else(|_| unreachable!()),
    );
    headers.insert(
        "x-forwarded-for",
        "203.0.113.7, 10.0.0.1".parse().unwrap_or_else(|_| unreachable!()),
    );
    headers.insert(USER_AGENT, "campus-web".parse().unwrap_or_else(|_| unreachable!()));

    let (status, created) = send(&router, request).await;
    assert_eq!(status, StatusCode::CREATED);

    let records = student_audit_log(&router).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["action"], json!("create"));
    assert_eq!(records[0]["entity_id"], created["entity_id"]);
    assert_eq!(records[0]["actor_id"], json!("user-1"));
    assert_eq!(records[0]["actor_label"], json!("Registrar Office"));
    assert_eq!(records[0]["context"]["ip"], json!("203.0.113.7"));
    assert_eq!(records[0]["context"]["user_agent"], json!("campus-web"));
}

#[tokio::test]
async fn write_without_actor_header_is_not_audited() {
    let router = test_router();

    let (status, _) = send(&router, create_student_request(json!({"name": "Ben"}))).await;
    assert_eq!(status, StatusCode::CREATED);

    assert!(student_audit_log(&router).await.is_empty());
}
