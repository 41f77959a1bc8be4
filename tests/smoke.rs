//! Quick checks that the service starts up and answers.

mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

use common::*;

#[test]
fn test_configuration_loads_in_test_mode() {
    let config = test_config();
    assert!(config.testing);
    assert!(config.server.debug);
    assert_eq!(config.database.name.as_deref(), Some("learning_platform_test"));
    assert_eq!(config.server.port, 8001);
}

#[tokio::test]
async fn test_service_answers_health_and_listing() {
    let (app, _) = app();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(empty_request("GET", "/documents")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = app();
    let response = app
        .oneshot(empty_request("GET", "/does-not-exist"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
