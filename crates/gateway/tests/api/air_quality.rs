use crate::helpers::{air_report, spawn_app, MockAirSource, MockSeriesSource};
use hyper::StatusCode;
use readings::{Coordinate, UpstreamError};
use std::sync::Arc;

fn idle_series() -> Arc<MockSeriesSource> {
    let mut series = MockSeriesSource::new();
    series.expect_fetch_point_series().times(0);
    Arc::new(series)
}

#[tokio::test]
async fn returns_report_for_nearest_station() {
    let mut air = MockAirSource::new();
    air.expect_fetch_air_quality()
        .withf(|coordinate| *coordinate == Coordinate::new(-12.05, -77.03))
        .times(1)
        .returning(|_| Ok(air_report(57.0)));

    let test_app = spawn_app(idle_series(), Some(Arc::new(air))).await;
    let (status, body) = test_app.get("/air-quality?lat=-12.05&lon=-77.03").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["description"], "air quality near Lima, Peru");
    let data = &body["data"];
    assert_eq!(data["aqi"]["value"], 57.0);
    assert_eq!(data["aqi"]["color"], "yellow");
    assert_eq!(data["mainPollutants"]["o3"]["value"], 12.0);
    assert!(data["mainPollutants"]["co"]["value"].is_null());
    assert_eq!(data["environment"]["humidity"], 83.0);
}

#[tokio::test]
async fn repeated_lookup_is_cached() {
    let mut air = MockAirSource::new();
    air.expect_fetch_air_quality()
        .times(1)
        .returning(|_| Ok(air_report(20.0)));

    let test_app = spawn_app(idle_series(), Some(Arc::new(air))).await;
    let (first, _) = test_app.get("/air-quality?lat=1&lon=2").await;
    let (second, _) = test_app.get("/air-quality?lat=1&lon=2").await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
}

#[tokio::test]
async fn missing_token_is_service_unavailable() {
    let test_app = spawn_app(idle_series(), None).await;
    let (status, body) = test_app.get("/air-quality?lat=1&lon=2").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], 503);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn upstream_error_is_bad_gateway() {
    let mut air = MockAirSource::new();
    air.expect_fetch_air_quality()
        .times(1)
        .returning(|_| Err(UpstreamError::Malformed("Invalid key".to_string())));

    let test_app = spawn_app(idle_series(), Some(Arc::new(air))).await;
    let (status, body) = test_app.get("/air-quality?lat=1&lon=2").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["data"].as_str().unwrap().contains("Invalid key"));
}

#[tokio::test]
async fn bad_coordinates_are_rejected() {
    let mut air = MockAirSource::new();
    air.expect_fetch_air_quality().times(0);

    let test_app = spawn_app(idle_series(), Some(Arc::new(air))).await;
    let (status, body) = test_app.get("/air-quality?lat=1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["description"], "lon is required");
}
