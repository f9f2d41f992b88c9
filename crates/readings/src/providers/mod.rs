//! Upstream data sources.
//!
//! Each provider unwraps its own response envelope and reports failures as
//! [`UpstreamError`]; nothing past this boundary sees a transport error.

pub mod nasa_power;
pub mod waqi;

use async_trait::async_trait;

use crate::{
    error::UpstreamError,
    series::{Coordinate, DateRange, TimeSeriesByVariable},
};

use self::waqi::AirQualityReport;

/// Remote time series keyed by variable and date for one coordinate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    async fn fetch_point_series(
        &self,
        coordinate: &Coordinate,
        range: &DateRange,
    ) -> Result<TimeSeriesByVariable, UpstreamError>;
}

/// Nearest-station air quality for one coordinate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AirQualitySource: Send + Sync {
    async fn fetch_air_quality(
        &self,
        coordinate: &Coordinate,
    ) -> Result<AirQualityReport, UpstreamError>;
}
