use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date, Duration};

use crate::error::DateError;

/// Provider marker for "no observation" in a daily series.
pub const MISSING_VALUE: f64 = -999.0;

/// Decimal places kept on coordinates used as cache keys and query params.
pub const COORDINATE_PRECISION: u32 = 6;

const COMPACT_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");

/// Decimal places kept on every reported statistic.
pub const STAT_PRECISION: u32 = 2;

/// Variable name -> (YYYYMMDD date -> value).
pub type TimeSeriesByVariable = BTreeMap<String, BTreeMap<String, f64>>;

pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10_f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    // normalizes -0.0 so keys never differ on the sign of zero
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// True for values that carry a real observation.
pub fn is_present(value: f64) -> bool {
    value.is_finite() && value != MISSING_VALUE
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Builds a coordinate rounded to [`COORDINATE_PRECISION`] places.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: round_to(lat, COORDINATE_PRECISION),
            lon: round_to(lon, COORDINATE_PRECISION),
        }
    }

    /// Shifts by the given degrees. Latitude is clamped to the poles and
    /// longitude wraps across the antimeridian, so lattices near either edge
    /// stay on valid coordinates (points past a pole collapse onto it).
    pub fn offset(&self, lat_delta: f64, lon_delta: f64) -> Self {
        let lat = (self.lat + lat_delta).clamp(-90.0, 90.0);
        let mut lon = self.lon + lon_delta;
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        Self::new(lat, lon)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.lat, self.lon)
    }
}

/// Inclusive range of `YYYYMMDD` dates.
///
/// `start <= end` is assumed by the engine, not checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Validates both bounds as calendar dates in `YYYYMMDD` form.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateError> {
        parse_compact_date(start)?;
        parse_compact_date(end)?;
        Ok(Self::new(start, end))
    }

    /// `days` days back from `today`, both ends inclusive.
    pub fn trailing_days(today: Date, days: i64) -> Self {
        let start = today.saturating_sub(Duration::days(days));
        Self::new(compact_date(start), compact_date(today))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

pub fn compact_date(date: Date) -> String {
    // every component of the description exists on a Date
    date.format(COMPACT_DATE).unwrap_or_default()
}

pub fn parse_compact_date(value: &str) -> Result<Date, DateError> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateError::new(value));
    }
    Date::parse(value, COMPACT_DATE).map_err(|_| DateError::new(value))
}

/// Outcome of fetching one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PointResult {
    Success {
        coordinate: Coordinate,
        series: TimeSeriesByVariable,
    },
    Failure {
        coordinate: Coordinate,
        error: String,
    },
}

impl PointResult {
    pub fn coordinate(&self) -> Coordinate {
        match self {
            PointResult::Success { coordinate, .. } | PointResult::Failure { coordinate, .. } => {
                *coordinate
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PointResult::Success { .. })
    }

    pub fn failure(&self) -> Option<PointFailure> {
        match self {
            PointResult::Failure { coordinate, error } => Some(PointFailure {
                coordinate: *coordinate,
                error: error.clone(),
            }),
            PointResult::Success { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFailure {
    pub coordinate: Coordinate,
    pub error: String,
}

impl fmt::Display for PointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.coordinate, self.error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableStat {
    pub mean: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stddev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub center: Coordinate,
    /// Points whose series contributed to the statistics.
    pub sampled_points: Vec<Coordinate>,
    pub range: DateRange,
    pub latest_date: Option<String>,
    pub per_variable_stats: BTreeMap<String, BTreeMap<String, VariableStat>>,
    pub latest_by_variable: BTreeMap<String, Option<f64>>,
    /// Points that failed upstream but did not sink the request.
    #[serde(default)]
    pub failed_points: Vec<PointFailure>,
}
