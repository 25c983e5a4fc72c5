mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use prodflow_api::config::AppConfig;
use prodflow_api::events::{process_events, EventSender};
use prodflow_api::{app, AppState};

async fn test_app() -> axum::Router {
    let ctx = common::setup().await;
    let cfg = AppConfig::new(
        "sqlite::memory:".into(),
        "127.0.0.1".into(),
        8080,
        "test".into(),
    );
    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(process_events(rx));
    app(AppState::new(ctx.db.clone(), cfg, EventSender::new(tx)))
}

#[tokio::test]
async fn health_endpoint_reports_database_status() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn create_plan_endpoint_returns_created_envelope() {
    let app = test_app().await;

    let payload = serde_json::json!({
        "source_spec_id": Uuid::new_v4(),
        "target_spec_id": Uuid::new_v4(),
        "total_quantity": 50,
        "urgent": true,
        "actor_id": Uuid::new_v4(),
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/plans")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total_quantity"], 50);
    assert_eq!(body["data"]["urgent"], true);
}

#[tokio::test]
async fn missing_job_card_maps_to_not_found_body() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/job-cards/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["kind"], "not_found");
    assert_eq!(body["retryable"], false);
}
