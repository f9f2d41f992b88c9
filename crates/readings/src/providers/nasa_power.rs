use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::{collections::BTreeMap, time::Duration};

use super::SeriesProvider;
use crate::{
    error::UpstreamError,
    series::{Coordinate, DateRange, TimeSeriesByVariable, MISSING_VALUE},
};

pub const DEFAULT_BASE_URL: &str = "https://power.larc.nasa.gov/api/temporal/daily/point";

/// Daily variables requested from NASA POWER:
/// temperature (mean/max/min), precipitation, surface shortwave irradiance,
/// wind speed and direction at 2m, relative humidity, surface pressure.
pub const DEFAULT_PARAMETERS: &[&str] = &[
    "T2M",
    "T2M_MAX",
    "T2M_MIN",
    "PRECTOT",
    "ALLSKY_SFC_SW_DWN",
    "WS2M",
    "WD2M",
    "RH2M",
    "PS",
];

pub const DEFAULT_COMMUNITY: &str = "AG";

const MAX_ERROR_BODY: usize = 300;

pub struct NasaPowerClient {
    client: Client,
    base_url: String,
    parameters: Vec<String>,
    community: String,
}

impl NasaPowerClient {
    pub fn new(
        base_url: impl Into<String>,
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
            parameters: DEFAULT_PARAMETERS.iter().map(|p| p.to_string()).collect(),
            community: DEFAULT_COMMUNITY.to_string(),
        })
    }

    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        if !parameters.is_empty() {
            self.parameters = parameters;
        }
        self
    }

    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = community.into();
        self
    }

    fn query(&self, coordinate: &Coordinate, range: &DateRange) -> Vec<(&'static str, String)> {
        vec![
            ("parameters", self.parameters.join(",")),
            ("community", self.community.clone()),
            ("format", "JSON".to_string()),
            ("start", range.start.clone()),
            ("end", range.end.clone()),
            ("latitude", coordinate.lat.to_string()),
            ("longitude", coordinate.lon.to_string()),
        ]
    }
}

#[async_trait]
impl SeriesProvider for NasaPowerClient {
    async fn fetch_point_series(
        &self,
        coordinate: &Coordinate,
        range: &DateRange,
    ) -> Result<TimeSeriesByVariable, UpstreamError> {
        debug!("requesting NASA POWER series for {} over {}", coordinate, range);
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query(coordinate, range))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: truncate(&body, MAX_ERROR_BODY),
            });
        }

        parse_power_payload(&body)
    }
}

/// Unwraps `properties.parameter` from a POWER daily point response.
///
/// The provider's declared `header.fill_value` is normalized to
/// [`MISSING_VALUE`]; non-numeric cells are dropped.
pub fn parse_power_payload(body: &str) -> Result<TimeSeriesByVariable, UpstreamError> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| UpstreamError::Malformed(format!("invalid JSON: {}", e)))?;

    let parameters = payload
        .pointer("/properties/parameter")
        .and_then(Value::as_object)
        .ok_or_else(|| UpstreamError::Malformed("missing properties.parameter".to_string()))?;

    let fill_value = payload
        .pointer("/header/fill_value")
        .and_then(Value::as_f64)
        .unwrap_or(MISSING_VALUE);

    let mut series = TimeSeriesByVariable::new();
    for (variable, dates) in parameters {
        let dates = dates.as_object().ok_or_else(|| {
            UpstreamError::Malformed(format!("variable {} is not a date map", variable))
        })?;

        let values: BTreeMap<String, f64> = dates
            .iter()
            .filter_map(|(date, value)| {
                let value = value.as_f64()?;
                let value = if value == fill_value {
                    MISSING_VALUE
                } else {
                    value
                };
                Some((date.clone(), value))
            })
            .collect();
        series.insert(variable.clone(), values);
    }
    Ok(series)
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
