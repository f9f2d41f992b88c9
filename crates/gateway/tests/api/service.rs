use crate::helpers::{spawn_app, MockSeriesSource};
use axum::{
    body::{to_bytes, Body},
    http::Request,
};
use hyper::{Method, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_ok() {
    let test_app = spawn_app(Arc::new(MockSeriesSource::new()), None).await;
    let (status, body) = test_app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn docs_are_served() {
    let test_app = spawn_app(Arc::new(MockSeriesSource::new()), None).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/docs")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("/climate"));
}
