use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use readings::AirQualityReport;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{routes::climate::parse_coordinate, ApiError, AppState, Envelope};

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AirQualityParams {
    /// Latitude in degrees, -90 to 90
    pub lat: Option<String>,
    /// Longitude in degrees, -180 to 180
    pub lon: Option<String>,
}

#[utoipa::path(
    get,
    path = "/air-quality",
    params(AirQualityParams),
    responses(
        (status = OK, description = "Nearest-station air quality index with pollutant breakdown"),
        (status = BAD_REQUEST, description = "Missing or malformed query parameters"),
        (status = BAD_GATEWAY, description = "Air quality provider failed"),
        (status = SERVICE_UNAVAILABLE, description = "No air quality token configured")
    ))]
pub async fn air_quality(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AirQualityParams>,
) -> Result<Json<Envelope<AirQualityReport>>, ApiError> {
    let lat = parse_coordinate("lat", params.lat.as_deref(), 90.0)?;
    let lon = parse_coordinate("lon", params.lon.as_deref(), 180.0)?;

    let service = state.air_quality.as_ref().ok_or_else(|| {
        ApiError::Unavailable("air quality source is not configured".to_string())
    })?;
    let report = service.report_for(lat, lon).await?;

    let description = match report.location.as_deref() {
        Some(name) => format!("air quality near {}", name),
        None => "air quality at nearest station".to_string(),
    };
    Ok(Json(Envelope::ok(description, report)))
}
