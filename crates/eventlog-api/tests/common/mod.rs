//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use eventlog_core::repository::RecordRepository;
use eventlog_store::EventStore;
use eventlog_test_support::{InMemoryRecordRepository, SteppingIdGenerator};
use http_body_util::BodyExt;
use tower::ServiceExt;

use eventlog_api::app;
use eventlog_api::state::AppState;

/// Build the full app router over `repository` with deterministic ids that
/// start at 2026-01-15T10:00:00Z and advance one second per event.
pub fn build_test_app_with(repository: Arc<dyn RecordRepository>) -> Router {
    let event_store =
        EventStore::new(repository).with_id_generator(Arc::new(SteppingIdGenerator::default()));
    app(AppState::new(event_store))
}

/// Build the full app router over a fresh in-memory repository, returning the
/// repository for inspection.
pub fn build_test_app() -> (Router, Arc<InMemoryRecordRepository>) {
    let repository = Arc::new(InMemoryRecordRepository::new());
    let app = build_test_app_with(repository.clone());
    (app, repository)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}

/// Send a POST request with a JSON body and return the response. Empty or
/// non-JSON bodies come back as `Value::Null`.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}
