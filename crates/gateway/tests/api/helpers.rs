use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use gateway::{app, build_app_state};
use hyper::Method;
use mockall::mock;
use readings::{
    providers::waqi::{Environment, Pollutants},
    AirQualityReport, AirQualitySource, AqiReading, Coordinate, DateRange, SamplerConfig,
    SeriesProvider, TimeSeriesByVariable, UpstreamError,
};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};
use tower::ServiceExt;

mock! {
    pub SeriesSource {}
    #[async_trait]
    impl SeriesProvider for SeriesSource {
        async fn fetch_point_series(
            &self,
            coordinate: &Coordinate,
            range: &DateRange,
        ) -> Result<TimeSeriesByVariable, UpstreamError>;
    }
}

mock! {
    pub AirSource {}
    #[async_trait]
    impl AirQualitySource for AirSource {
        async fn fetch_air_quality(
            &self,
            coordinate: &Coordinate,
        ) -> Result<AirQualityReport, UpstreamError>;
    }
}

pub struct TestApp {
    pub app: Router,
}

pub async fn spawn_app(
    series: Arc<dyn SeriesProvider>,
    air_quality: Option<Arc<dyn AirQualitySource>>,
) -> TestApp {
    let app_state = build_app_state(series, air_quality, SamplerConfig::default())
        .expect("Failed to build app state");
    TestApp { app: app(app_state) }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request.");

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).expect("response body is not json");
        (status, json)
    }
}

/// Two days of T2M where every value is the point's latitude, and RH2M
/// with a missing value on the second day.
pub fn series_for(coordinate: &Coordinate) -> TimeSeriesByVariable {
    BTreeMap::from([
        (
            "T2M".to_string(),
            BTreeMap::from([
                ("20250101".to_string(), coordinate.lat),
                ("20250102".to_string(), coordinate.lat + 1.0),
            ]),
        ),
        (
            "RH2M".to_string(),
            BTreeMap::from([
                ("20250101".to_string(), 80.0),
                ("20250102".to_string(), -999.0),
            ]),
        ),
    ])
}

pub fn air_report(aqi: f64) -> AirQualityReport {
    AirQualityReport {
        coordinates: Some(Coordinate::new(-12.0464, -77.0428)),
        location: Some("Lima, Peru".to_string()),
        aqi: Some(aqi).into(),
        dominant: Some("pm25".to_string()),
        main_pollutants: Pollutants {
            pm25: Some(aqi).into(),
            pm10: Some(20.0).into(),
            co: AqiReading::from(None),
            no2: AqiReading::from(None),
            so2: AqiReading::from(None),
            o3: Some(12.0).into(),
        },
        environment: Environment {
            temperature: Some(19.5),
            humidity: Some(83.0),
            pressure: None,
        },
        time: Some("2025-01-02 10:00:00".to_string()),
        source: "World Air Quality Index".to_string(),
    }
}
