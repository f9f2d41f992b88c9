use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, time::Duration};

use super::AirQualitySource;
use crate::{error::UpstreamError, series::Coordinate};

pub const DEFAULT_BASE_URL: &str = "https://api.waqi.info";

/// Category on the standard US EPA AQI scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiLevel {
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "Unhealthy for sensitive groups")]
    UnhealthyForSensitiveGroups,
    #[serde(rename = "Unhealthy")]
    Unhealthy,
    #[serde(rename = "Very unhealthy")]
    VeryUnhealthy,
    #[serde(rename = "Hazardous")]
    Hazardous,
    #[serde(rename = "No data")]
    NoData,
}

impl AqiLevel {
    pub fn classify(aqi: Option<f64>) -> Self {
        match aqi {
            None => AqiLevel::NoData,
            Some(v) if v <= 50.0 => AqiLevel::Good,
            Some(v) if v <= 100.0 => AqiLevel::Moderate,
            Some(v) if v <= 150.0 => AqiLevel::UnhealthyForSensitiveGroups,
            Some(v) if v <= 200.0 => AqiLevel::Unhealthy,
            Some(v) if v <= 300.0 => AqiLevel::VeryUnhealthy,
            Some(_) => AqiLevel::Hazardous,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            AqiLevel::Good => "green",
            AqiLevel::Moderate => "yellow",
            AqiLevel::UnhealthyForSensitiveGroups => "orange",
            AqiLevel::Unhealthy => "red",
            AqiLevel::VeryUnhealthy => "purple",
            AqiLevel::Hazardous => "maroon",
            AqiLevel::NoData => "gray",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiReading {
    pub value: Option<f64>,
    pub level: AqiLevel,
    pub color: String,
}

impl From<Option<f64>> for AqiReading {
    fn from(value: Option<f64>) -> Self {
        let level = AqiLevel::classify(value);
        Self {
            value,
            level,
            color: level.color().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    pub pm25: AqiReading,
    pub pm10: AqiReading,
    pub co: AqiReading,
    pub no2: AqiReading,
    pub so2: AqiReading,
    pub o3: AqiReading,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQualityReport {
    /// Location of the reporting station, not the requested point.
    pub coordinates: Option<Coordinate>,
    pub location: Option<String>,
    pub aqi: AqiReading,
    pub dominant: Option<String>,
    pub main_pollutants: Pollutants,
    pub environment: Environment,
    pub time: Option<String>,
    pub source: String,
}

#[derive(Deserialize)]
struct Envelope {
    status: String,
    data: Value,
}

#[derive(Deserialize)]
struct FeedData {
    // "-" when the station has no current index
    aqi: Value,
    #[serde(default)]
    attributions: Vec<Attribution>,
    city: Option<City>,
    dominentpol: Option<String>,
    #[serde(default)]
    iaqi: HashMap<String, IaqiValue>,
    time: Option<FeedTime>,
}

#[derive(Deserialize)]
struct Attribution {
    name: String,
}

#[derive(Deserialize)]
struct City {
    geo: Option<Vec<f64>>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct IaqiValue {
    v: f64,
}

#[derive(Deserialize)]
struct FeedTime {
    iso: Option<String>,
}

pub struct WaqiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl WaqiClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    fn feed_url(&self, coordinate: &Coordinate) -> String {
        format!(
            "{}/feed/geo:{};{}/",
            self.base_url.trim_end_matches('/'),
            coordinate.lat,
            coordinate.lon
        )
    }
}

#[async_trait]
impl AirQualitySource for WaqiClient {
    async fn fetch_air_quality(
        &self,
        coordinate: &Coordinate,
    ) -> Result<AirQualityReport, UpstreamError> {
        let url = self.feed_url(coordinate);
        debug!("requesting WAQI feed for {}", coordinate);
        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }

        let body = response.text().await?;
        parse_waqi_payload(&body)
    }
}

/// Validates the `status == "ok"` marker and maps the feed into a report.
pub fn parse_waqi_payload(body: &str) -> Result<AirQualityReport, UpstreamError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| UpstreamError::Malformed(format!("invalid JSON: {}", e)))?;

    if envelope.status != "ok" {
        let reason = envelope
            .data
            .as_str()
            .unwrap_or("no air quality data found")
            .to_string();
        return Err(UpstreamError::Malformed(reason));
    }

    let feed: FeedData = serde_json::from_value(envelope.data)
        .map_err(|e| UpstreamError::Malformed(format!("unexpected feed shape: {}", e)))?;

    let reading = |key: &str| feed.iaqi.get(key).map(|v| v.v);
    let (coordinates, location) = match feed.city {
        Some(city) => (
            city.geo.and_then(|geo| match geo.as_slice() {
                [lat, lon, ..] => Some(Coordinate::new(*lat, *lon)),
                _ => None,
            }),
            city.name,
        ),
        None => (None, None),
    };
    let source = if feed.attributions.is_empty() {
        "Unknown".to_string()
    } else {
        feed.attributions
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    Ok(AirQualityReport {
        coordinates,
        location,
        aqi: feed.aqi.as_f64().into(),
        dominant: feed.dominentpol,
        main_pollutants: Pollutants {
            pm25: reading("pm25").into(),
            pm10: reading("pm10").into(),
            co: reading("co").into(),
            no2: reading("no2").into(),
            so2: reading("so2").into(),
            o3: reading("o3").into(),
        },
        environment: Environment {
            temperature: reading("t"),
            humidity: reading("h"),
            pressure: reading("p"),
        },
        time: feed.time.and_then(|t| t.iso),
        source,
    })
}
