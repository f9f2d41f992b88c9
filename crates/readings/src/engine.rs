use envgrid_core::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_GRID_SIZE, DEFAULT_GRID_STEP, DEFAULT_UPSTREAM_TIMEOUT_SECS,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use crate::{
    aggregate::{Aggregator, StatisticsMode},
    cache::TtlCache,
    error::SamplerError,
    fanout::fetch_all,
    fetcher::{NoiseConfig, PointFetcher},
    grid::{build_grid, center_index},
    providers::SeriesProvider,
    series::{AggregateResult, Coordinate, DateRange},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    /// Average over the whole lattice.
    #[default]
    Grid,
    /// Only the lattice center, no spatial averaging.
    Single,
}

impl fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingMode::Grid => write!(f, "grid"),
            SamplingMode::Single => write!(f, "single"),
        }
    }
}

impl FromStr for SamplingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grid" => Ok(SamplingMode::Grid),
            "single" | "point" => Ok(SamplingMode::Single),
            other => Err(format!(
                "unknown sampling mode '{}', expected 'grid' or 'single'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AggregateOptions {
    pub sampling: SamplingMode,
    pub statistics: StatisticsMode,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Lattice side length, must be odd
    pub grid_size: usize,
    /// Lattice spacing in degrees
    pub grid_step: f64,
    /// Lifetime of cached point series and aggregates
    pub cache_ttl_secs: u64,
    /// Bound on each upstream call
    pub upstream_timeout_secs: u64,
    /// Enables cosmetic jitter of fetched values, in percent
    pub noise_percent: Option<f64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            grid_step: DEFAULT_GRID_STEP,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            noise_percent: None,
        }
    }
}

impl SamplerConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// Spatial estimate for a center coordinate from a lattice of point fetches.
pub struct GridSampler {
    config: SamplerConfig,
    fetcher: Arc<PointFetcher>,
    aggregates: TtlCache<AggregateResult>,
}

impl GridSampler {
    /// Rejects grid settings that cannot form a centered lattice.
    pub fn new(
        provider: Arc<dyn SeriesProvider>,
        config: SamplerConfig,
    ) -> Result<Self, SamplerError> {
        build_grid(Coordinate::new(0.0, 0.0), config.grid_size, config.grid_step)?;

        let noise = config.noise_percent.and_then(NoiseConfig::new);
        let fetcher = PointFetcher::new(
            provider,
            Arc::new(TtlCache::new()),
            config.cache_ttl(),
            config.upstream_timeout(),
        )
        .with_noise(noise);

        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
            aggregates: TtlCache::new(),
        })
    }

    pub fn cache_key(center: &Coordinate, range: &DateRange, options: &AggregateOptions) -> String {
        format!(
            "aggregate:{}:{}:{}:{}",
            center, range, options.sampling, options.statistics
        )
    }

    /// Aggregated readings around `(lat, lon)` for `range`.
    ///
    /// Repeat requests within the cache TTL are answered without touching the
    /// grid. Fails with [`SamplerError::TotalFailure`] only when no point
    /// could be fetched.
    pub async fn aggregate_for_center(
        &self,
        lat: f64,
        lon: f64,
        range: &DateRange,
        options: AggregateOptions,
    ) -> Result<AggregateResult, SamplerError> {
        let center = Coordinate::new(lat, lon);
        let key = Self::cache_key(&center, range, &options);
        if let Some(cached) = self.aggregates.get(&key) {
            debug!("aggregate cache hit: {}", key);
            return Ok(cached);
        }

        let grid = build_grid(center, self.config.grid_size, self.config.grid_step)?;
        let coordinates = match options.sampling {
            SamplingMode::Grid => grid,
            SamplingMode::Single => {
                let middle = grid
                    .get(center_index(self.config.grid_size))
                    .copied()
                    .ok_or_else(|| SamplerError::Internal("grid has no center".to_string()))?;
                vec![middle]
            }
        };

        info!(
            "sampling {} point(s) around {} for {} ({} mode)",
            coordinates.len(),
            center,
            range,
            options.sampling
        );
        let results = fetch_all(Arc::clone(&self.fetcher), &coordinates, range).await?;

        let aggregator = Aggregator::new(options.statistics);
        let aggregate = match options.sampling {
            SamplingMode::Grid => aggregator.aggregate(center, range, &results),
            SamplingMode::Single => aggregator.single_point(center, range, &results),
        };

        self.aggregates
            .put(key, aggregate.clone(), self.config.cache_ttl());
        Ok(aggregate)
    }
}
