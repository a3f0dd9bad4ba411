//! Integration tests for the event routes.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use eventlog_core::event::TenantId;
use eventlog_test_support::FailingRecordRepository;
use serde_json::json;
use uuid::Uuid;

fn lifecycle_event(tenant_id: Uuid, device_id: Uuid, state: &str) -> serde_json::Value {
    json!({
        "tenant_id": tenant_id,
        "entity_id": { "entity_type": "DEVICE", "id": device_id },
        "event_type": "LIFECYCLE",
        "body": { "state": state }
    })
}

fn ids_of(json: &serde_json::Value) -> Vec<String> {
    json.as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn test_save_fills_in_id_uid_and_system_tenant() {
    let (app, repository) = common::build_test_app();
    let device_id = Uuid::new_v4();

    // POST /api/v1/events without id, uid or tenant
    let (status, json) = common::post_json(
        app,
        "/api/v1/events",
        &json!({
            "entity_id": { "entity_type": "DEVICE", "id": device_id },
            "event_type": "LIFECYCLE",
            "body": { "state": "STARTED" }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let id = json["id"].as_str().unwrap();
    assert_eq!(json["event_uid"], id);
    assert_eq!(json["tenant_id"], TenantId::SYSTEM.to_string());
    assert_eq!(json["entity_id"]["id"], device_id.to_string());
    assert_eq!(json["body"]["state"], "STARTED");
    assert_eq!(repository.len(), 1);
}

#[tokio::test]
async fn test_save_keeps_caller_supplied_fields() {
    let (app, repository) = common::build_test_app();
    let tenant_id = Uuid::new_v4();
    let device_id = Uuid::new_v4();
    let event_id = Uuid::now_v7();

    let mut body = lifecycle_event(tenant_id, device_id, "STARTED");
    body["id"] = json!(event_id);
    body["event_uid"] = json!("boot-1");

    let (status, json) = common::post_json(app, "/api/v1/events", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], event_id.to_string());
    assert_eq!(json["event_uid"], "boot-1");
    assert_eq!(json["tenant_id"], tenant_id.to_string());
    assert_eq!(repository.events()[0].event_uid, "boot-1");
}

#[tokio::test]
async fn test_save_with_missing_fields_is_rejected() {
    let (app, repository) = common::build_test_app();

    let (status, _) =
        common::post_json(app, "/api/v1/events", &json!({ "event_type": "LIFECYCLE" })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(repository.is_empty());
}

#[tokio::test]
async fn test_save_async_is_accepted_and_eventually_stored() {
    let (app, repository) = common::build_test_app();
    let tenant_id = Uuid::new_v4();
    let device_id = Uuid::new_v4();

    let (status, json) = common::post_json(
        app,
        "/api/v1/events/async",
        &lifecycle_event(tenant_id, device_id, "STARTED"),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    let id = json["id"].as_str().unwrap().to_owned();

    for _ in 0..100 {
        if !repository.is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    let stored = repository.events();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id.to_string(), id);
}

#[tokio::test]
async fn test_save_if_absent_writes_once_per_tenant_and_entity() {
    let (app, repository) = common::build_test_app();
    let tenant_id = Uuid::new_v4();
    let device_id = Uuid::new_v4();

    let (status, json) = common::post_json(
        app.clone(),
        "/api/v1/events/if-absent",
        &lifecycle_event(tenant_id, device_id, "STARTED"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["body"]["state"], "STARTED");

    // A different event type for the same entity is still skipped.
    let mut second = lifecycle_event(tenant_id, device_id, "STOPPED");
    second["event_type"] = json!("TELEMETRY");
    let (status, _) = common::post_json(app.clone(), "/api/v1/events/if-absent", &second).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Another tenant is unaffected.
    let (status, _) = common::post_json(
        app,
        "/api/v1/events/if-absent",
        &lifecycle_event(Uuid::new_v4(), device_id, "STARTED"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(repository.len(), 2);
}

#[tokio::test]
async fn test_find_event_by_natural_key() {
    let (app, _) = common::build_test_app();
    let tenant_id = Uuid::new_v4();
    let device_id = Uuid::new_v4();

    let mut body = lifecycle_event(tenant_id, device_id, "STARTED");
    body["event_uid"] = json!("boot-1");
    let (status, saved) = common::post_json(app.clone(), "/api/v1/events", &body).await;
    assert_eq!(status, StatusCode::OK);

    let base = format!("/api/v1/tenants/{tenant_id}/entities/DEVICE/{device_id}/events");

    let (status, json) = common::get_json(app.clone(), &format!("{base}/LIFECYCLE/boot-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, saved);

    let (status, json) = common::get_json(app.clone(), &format!("{base}/LIFECYCLE/boot-2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let other_tenant = Uuid::new_v4();
    let (status, _) = common::get_json(
        app,
        &format!("/api/v1/tenants/{other_tenant}/entities/DEVICE/{device_id}/events/LIFECYCLE/boot-1"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_find_events_pages_by_time_and_order() {
    let (app, _) = common::build_test_app();
    let tenant_id = Uuid::new_v4();
    let device_id = Uuid::new_v4();

    // Ids are stamped 10:00:00 through 10:00:04.
    let mut saved = Vec::new();
    for state in ["A", "B", "C", "D", "E"] {
        let (status, json) = common::post_json(
            app.clone(),
            "/api/v1/events",
            &lifecycle_event(tenant_id, device_id, state),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        saved.push(json["id"].as_str().unwrap().to_owned());
    }
    let (status, _) = common::post_json(
        app.clone(),
        "/api/v1/events",
        &lifecycle_event(tenant_id, Uuid::new_v4(), "OTHER"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let entity = format!("tenant_id={tenant_id}&entity_type=DEVICE&entity_id={device_id}");

    // Default: newest first, limit 10.
    let (status, json) = common::get_json(app.clone(), &format!("/api/v1/events?{entity}")).await;
    assert_eq!(status, StatusCode::OK);
    let expected: Vec<String> = saved.iter().rev().cloned().collect();
    assert_eq!(ids_of(&json), expected);

    // Inclusive time bounds, oldest first.
    let (status, json) = common::get_json(
        app.clone(),
        &format!(
            "/api/v1/events?{entity}&start_time=2026-01-15T10:00:01Z&end_time=2026-01-15T10:00:03Z&asc_order=true"
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids_of(&json), saved[1..4].to_vec());

    // Cursor after the second event, two per page.
    let (status, json) = common::get_json(
        app.clone(),
        &format!(
            "/api/v1/events?{entity}&asc_order=true&limit=2&id_offset={}",
            saved[1]
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids_of(&json), saved[2..4].to_vec());

    // No filters: every tenant and entity.
    let (status, json) = common::get_json(app, "/api/v1/events?limit=100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_find_events_with_zero_limit_is_empty() {
    let (app, _) = common::build_test_app();
    let tenant_id = Uuid::new_v4();
    let (status, _) = common::post_json(
        app.clone(),
        "/api/v1/events",
        &lifecycle_event(tenant_id, Uuid::new_v4(), "STARTED"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = common::get_json(app, "/api/v1/events?limit=0").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn test_find_events_with_half_an_entity_is_rejected() {
    let (app, _) = common::build_test_app();

    let (status, json) = common::get_json(app, "/api/v1/events?entity_type=DEVICE").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
}

#[tokio::test]
async fn test_find_latest_events_returns_newest_of_one_type() {
    let (app, _) = common::build_test_app();
    let tenant_id = Uuid::new_v4();
    let device_id = Uuid::new_v4();

    for state in ["STARTED", "RUNNING", "STOPPED"] {
        let (status, _) = common::post_json(
            app.clone(),
            "/api/v1/events",
            &lifecycle_event(tenant_id, device_id, state),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let mut telemetry = lifecycle_event(tenant_id, device_id, "HOT");
    telemetry["event_type"] = json!("TELEMETRY");
    let (status, _) = common::post_json(app.clone(), "/api/v1/events", &telemetry).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = common::get_json(
        app,
        &format!(
            "/api/v1/tenants/{tenant_id}/entities/DEVICE/{device_id}/events/latest?event_type=LIFECYCLE&limit=2"
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let states: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["body"]["state"].as_str().unwrap())
        .collect();
    assert_eq!(states, vec!["STOPPED", "RUNNING"]);
}

#[tokio::test]
async fn test_storage_failure_maps_to_503() {
    let app = common::build_test_app_with(Arc::new(FailingRecordRepository));

    let (status, json) = common::post_json(
        app.clone(),
        "/api/v1/events",
        &lifecycle_event(Uuid::new_v4(), Uuid::new_v4(), "STARTED"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "storage_unavailable");

    let (status, _) = common::get_json(app, "/api/v1/events").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
