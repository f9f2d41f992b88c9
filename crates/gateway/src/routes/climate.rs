use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use envgrid_core::DEFAULT_LOOKBACK_DAYS;
use readings::{
    series::{compact_date, parse_compact_date},
    AggregateOptions, AggregateResult, DateRange, SamplingMode, StatisticsMode,
};
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use utoipa::IntoParams;

use crate::{ApiError, AppState, Envelope};

/// Raw query string; everything is optional here so that bad input gets
/// the gateway's own 400 envelope instead of an extractor rejection.
#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClimateParams {
    /// Center latitude in degrees, -90 to 90
    pub lat: Option<String>,
    /// Center longitude in degrees, -180 to 180
    pub lon: Option<String>,
    /// First day, YYYYMMDD (default: seven days before `end`)
    pub start: Option<String>,
    /// Last day, YYYYMMDD (default: today, UTC)
    pub end: Option<String>,
    /// `grid` (default) or `single`
    pub mode: Option<String>,
    /// `full` (default) or `mean-only`
    pub stats: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClimateRequest {
    pub lat: f64,
    pub lon: f64,
    pub range: DateRange,
    pub options: AggregateOptions,
}

impl ClimateParams {
    pub fn validate(&self, today: Date) -> Result<ClimateRequest, ApiError> {
        let lat = parse_coordinate("lat", self.lat.as_deref(), 90.0)?;
        let lon = parse_coordinate("lon", self.lon.as_deref(), 180.0)?;
        let range = self.date_range(today)?;

        let sampling = match self.mode.as_deref() {
            Some(raw) => raw
                .parse::<SamplingMode>()
                .map_err(|_| ApiError::Validation(format!("unknown mode '{}'", raw)))?,
            None => SamplingMode::default(),
        };
        let statistics = match self.stats.as_deref() {
            Some(raw) => raw
                .parse::<StatisticsMode>()
                .map_err(|_| ApiError::Validation(format!("unknown stats '{}'", raw)))?,
            None => StatisticsMode::default(),
        };

        Ok(ClimateRequest {
            lat,
            lon,
            range,
            options: AggregateOptions {
                sampling,
                statistics,
            },
        })
    }

    fn date_range(&self, today: Date) -> Result<DateRange, ApiError> {
        let range = match (self.start.as_deref(), self.end.as_deref()) {
            (Some(start), Some(end)) => DateRange::parse(start, end),
            (Some(start), None) => DateRange::parse(start, &compact_date(today)),
            (None, Some(end)) => parse_compact_date(end)
                .map(|end| DateRange::trailing_days(end, DEFAULT_LOOKBACK_DAYS)),
            (None, None) => Ok(DateRange::trailing_days(today, DEFAULT_LOOKBACK_DAYS)),
        }
        .map_err(|e| ApiError::Validation(e.to_string()))?;

        // YYYYMMDD orders the same as the dates it spells
        if range.start > range.end {
            return Err(ApiError::Validation(format!(
                "start {} is after end {}",
                range.start, range.end
            )));
        }
        Ok(range)
    }
}

pub(crate) fn parse_coordinate(name: &str, raw: Option<&str>, limit: f64) -> Result<f64, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{} is required", name)))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| ApiError::Validation(format!("{} must be a number, got '{}'", name, raw)))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(ApiError::Validation(format!(
            "{} must be between -{} and {}",
            name, limit, limit
        )));
    }
    Ok(value)
}

#[utoipa::path(
    get,
    path = "/climate",
    params(ClimateParams),
    responses(
        (status = OK, description = "Per-variable, per-date statistics over the sampled grid"),
        (status = BAD_REQUEST, description = "Missing or malformed query parameters"),
        (status = BAD_GATEWAY, description = "No grid point could be fetched; data lists each point's error"),
        (status = INTERNAL_SERVER_ERROR, description = "Unexpected failure")
    ))]
pub async fn climate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClimateParams>,
) -> Result<Json<Envelope<AggregateResult>>, ApiError> {
    let request = params.validate(OffsetDateTime::now_utc().date())?;
    let result = state
        .sampler
        .aggregate_for_center(request.lat, request.lon, &request.range, request.options)
        .await?;

    let description = format!(
        "{} of {} point(s) sampled",
        result.sampled_points.len(),
        result.sampled_points.len() + result.failed_points.len()
    );
    Ok(Json(Envelope::ok(description, result)))
}
