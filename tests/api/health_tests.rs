//! Health Check API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common::{ScriptedSender, TestApp};

#[tokio::test]
async fn test_health_check_reports_counts() {
    let app = TestApp::with_sender(ScriptedSender::new());

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_jobs"], 0);
    assert_eq!(body["active_sessions"], 0);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::with_sender(ScriptedSender::new());

    let (status, body) = app.get("/health/live").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_text_format() {
    let app = TestApp::with_sender(ScriptedSender::new());

    let (status, body) = app.get("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("autotyper_"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::with_sender(ScriptedSender::new());

    let (status, _) = app.get("/api/v1/users/@me").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
