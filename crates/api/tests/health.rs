//! Integration tests for the health and status endpoints and general HTTP
//! behaviour.

mod common;

use axum::http::StatusCode;
use common::{body_json, get};

#[tokio::test]
async fn health_check_reports_memory_store() {
    let (app, _rx) = common::build_test_app();
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store"], "memory");
    assert_eq!(json["store_healthy"], true);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (app, _rx) = common::build_test_app();
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let (app, _rx) = common::build_test_app();
    let response = get(app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn status_reports_idle_accelerator_and_models() {
    let (app, _rx) = common::build_test_app();
    let response = get(app, "/api/v1/status").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["accelerator"], "idle");
    assert_eq!(data["backlog"], 0);
    assert_eq!(data["text_model"], "dolphin-llama3");
    assert_eq!(data["image_workflow"], "workflow_api.json");
    assert_eq!(data["jobs"]["completed"], 0);
}
