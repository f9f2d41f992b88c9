use crate::helpers::{series_for, spawn_app, MockSeriesSource};
use axum::{body::Body, http::Request};
use hyper::{header, Method, StatusCode};
use readings::{Coordinate, UpstreamError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::ServiceExt;

const RANGE: &str = "start=20250101&end=20250102";

#[tokio::test]
async fn grid_request_aggregates_all_points() {
    let mut series = MockSeriesSource::new();
    series
        .expect_fetch_point_series()
        .withf(|_, range| range.start == "20250101" && range.end == "20250102")
        .times(25)
        .returning(|coordinate, _| Ok(series_for(coordinate)));

    let test_app = spawn_app(Arc::new(series), None).await;
    let (status, body) = test_app
        .get(&format!("/climate?lat=10&lon=20&{}", RANGE))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    let data = &body["data"];
    assert_eq!(data["center"]["lat"], 10.0);
    assert_eq!(data["sampledPoints"].as_array().unwrap().len(), 25);
    assert_eq!(data["latestDate"], "20250102");

    let t2m = &data["perVariableStats"]["T2M"]["20250101"];
    assert_eq!(t2m["mean"], 10.0);
    assert_eq!(t2m["min"], 9.94);
    assert_eq!(t2m["max"], 10.06);
    assert_eq!(t2m["count"], 25);
    assert_eq!(data["latestByVariable"]["T2M"], 11.0);

    // missing values never count toward a date
    assert!(data["perVariableStats"]["RH2M"]["20250102"].is_null());
    assert!(data["latestByVariable"]["RH2M"].is_null());
    assert!(data["failedPoints"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn single_mode_only_fetches_center() {
    let mut series = MockSeriesSource::new();
    series
        .expect_fetch_point_series()
        .withf(|coordinate, _| *coordinate == Coordinate::new(-12.05, -77.03))
        .times(1)
        .returning(|coordinate, _| Ok(series_for(coordinate)));

    let test_app = spawn_app(Arc::new(series), None).await;
    let (status, body) = test_app
        .get(&format!("/climate?lat=-12.05&lon=-77.03&mode=single&{}", RANGE))
        .await;

    assert_eq!(status, StatusCode::OK);
    let stat = &body["data"]["perVariableStats"]["T2M"]["20250101"];
    assert_eq!(stat["mean"], -12.05);
    assert_eq!(stat["count"], 1);
    assert_eq!(stat["stddev"], 0.0);
}

#[tokio::test]
async fn mean_only_omits_spread() {
    let mut series = MockSeriesSource::new();
    series
        .expect_fetch_point_series()
        .times(25)
        .returning(|coordinate, _| Ok(series_for(coordinate)));

    let test_app = spawn_app(Arc::new(series), None).await;
    let (status, body) = test_app
        .get(&format!("/climate?lat=0&lon=0&stats=mean-only&{}", RANGE))
        .await;

    assert_eq!(status, StatusCode::OK);
    let stat = body["data"]["perVariableStats"]["T2M"]["20250101"]
        .as_object()
        .unwrap();
    assert!(stat.contains_key("mean"));
    assert!(stat.contains_key("count"));
    assert!(!stat.contains_key("stddev"));
    assert!(!stat.contains_key("min"));
    assert!(!stat.contains_key("max"));
}

#[tokio::test]
async fn repeated_request_is_served_from_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut series = MockSeriesSource::new();
    // failed points are not kept by the point cache, so a second trip
    // through the grid would ask for them again
    series.expect_fetch_point_series().returning(move |coordinate, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        if coordinate.lat > 1.5 {
            Err(UpstreamError::Status {
                status: 429,
                message: "Too Many Requests".to_string(),
            })
        } else {
            Ok(series_for(coordinate))
        }
    });

    let test_app = spawn_app(Arc::new(series), None).await;
    let uri = format!("/climate?lat=1.5&lon=2.5&{}", RANGE);
    let (first_status, first) = test_app.get(&uri).await;
    let (second_status, second) = test_app.get(&uri).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 25);
    assert_eq!(first["data"]["failedPoints"].as_array().unwrap().len(), 10);
    assert_eq!(first["data"]["failedPoints"], second["data"]["failedPoints"]);
    assert_eq!(first["data"], second["data"]);
}

#[tokio::test]
async fn partial_failure_still_answers() {
    let mut series = MockSeriesSource::new();
    series
        .expect_fetch_point_series()
        .times(25)
        .returning(|coordinate, _| {
            if coordinate.lat > 30.0 {
                Err(UpstreamError::Status {
                    status: 429,
                    message: "Too Many Requests".to_string(),
                })
            } else {
                Ok(series_for(coordinate))
            }
        });

    let test_app = spawn_app(Arc::new(series), None).await;
    let (status, body) = test_app
        .get(&format!("/climate?lat=30&lon=0&{}", RANGE))
        .await;

    // the two northern rows fail
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sampledPoints"].as_array().unwrap().len(), 15);
    assert_eq!(body["data"]["failedPoints"].as_array().unwrap().len(), 10);
    assert_eq!(
        body["data"]["perVariableStats"]["T2M"]["20250101"]["count"],
        15
    );
}

#[tokio::test]
async fn total_failure_is_bad_gateway_with_point_errors() {
    let mut series = MockSeriesSource::new();
    series
        .expect_fetch_point_series()
        .times(25)
        .returning(|_, _| {
            Err(UpstreamError::Status {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
        });

    let test_app = spawn_app(Arc::new(series), None).await;
    let (status, body) = test_app
        .get(&format!("/climate?lat=0&lon=0&{}", RANGE))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], 502);
    let failures = body["data"].as_array().unwrap();
    assert_eq!(failures.len(), 25);
    for failure in failures {
        assert!(failure["coordinate"]["lat"].is_number());
        assert!(failure["error"].as_str().unwrap().contains("503"));
    }
}

#[tokio::test]
async fn missing_coordinates_are_rejected_before_fetching() {
    let mut series = MockSeriesSource::new();
    series.expect_fetch_point_series().times(0);

    let test_app = spawn_app(Arc::new(series), None).await;

    let (status, body) = test_app.get("/climate?lon=20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(body["description"], "lat is required");
    assert!(body["data"].is_null());

    let (status, _) = test_app.get("/climate?lat=95&lon=20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = test_app.get("/climate?lat=1&lon=2&start=2025-01-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = test_app.get("/climate?lat=1&lon=2&mode=ring").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let mut series = MockSeriesSource::new();
    series.expect_fetch_point_series().times(0);
    let test_app = spawn_app(Arc::new(series), None).await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/climate")
        .header(header::ORIGIN, "https://maps.example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();

    let response = test_app
        .app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
