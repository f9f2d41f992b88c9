//! Derived environmental readings for a coordinate.
//!
//! The climate path samples a lattice of points around the requested center,
//! fetches each point's daily series concurrently, and reduces them into
//! per-variable, per-date statistics. Air quality is a single cached lookup.

pub mod aggregate;
pub mod air_quality;
pub mod cache;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod fetcher;
pub mod grid;
pub mod providers;
pub mod series;

pub use aggregate::{Aggregator, StatisticsMode};
pub use air_quality::AirQualityService;
pub use cache::TtlCache;
pub use engine::{AggregateOptions, GridSampler, SamplerConfig, SamplingMode};
pub use error::{GridError, SamplerError, UpstreamError};
pub use fanout::fetch_all;
pub use fetcher::{NoiseConfig, PointFetcher};
pub use grid::{build_grid, center_index};
pub use providers::{
    nasa_power::NasaPowerClient,
    waqi::{AirQualityReport, AqiLevel, AqiReading, WaqiClient},
    AirQualitySource, SeriesProvider,
};
pub use series::{
    AggregateResult, Coordinate, DateRange, PointFailure, PointResult, TimeSeriesByVariable,
    VariableStat, MISSING_VALUE,
};
