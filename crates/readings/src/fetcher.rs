use log::{debug, warn};
use rand::Rng;
use std::{sync::Arc, time::Duration};

use crate::{
    cache::TtlCache,
    error::UpstreamError,
    providers::SeriesProvider,
    series::{is_present, round_to, Coordinate, DateRange, PointResult, TimeSeriesByVariable},
};

/// Bounded multiplicative jitter applied to fetched values before caching.
///
/// Each value is scaled by a factor drawn from `[1 - p/100, 1 + p/100]`.
/// Cosmetic only: it keeps neighboring points from reporting identical values
/// when the upstream resolution is coarser than the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseConfig {
    pub percent: f64,
}

impl NoiseConfig {
    /// `None` for non-positive or non-finite percentages.
    pub fn new(percent: f64) -> Option<Self> {
        (percent.is_finite() && percent > 0.0).then_some(Self { percent })
    }

    fn apply(&self, series: &mut TimeSeriesByVariable) {
        let spread = self.percent / 100.0;
        let mut rng = rand::thread_rng();
        for values in series.values_mut() {
            for value in values.values_mut() {
                if is_present(*value) {
                    let factor = 1.0 + rng.gen_range(-spread..=spread);
                    *value = round_to(*value * factor, 2);
                }
            }
        }
    }
}

/// Fetches one coordinate's series through the per-point cache.
pub struct PointFetcher {
    provider: Arc<dyn SeriesProvider>,
    cache: Arc<TtlCache<TimeSeriesByVariable>>,
    ttl: Duration,
    timeout: Duration,
    noise: Option<NoiseConfig>,
}

impl PointFetcher {
    pub fn new(
        provider: Arc<dyn SeriesProvider>,
        cache: Arc<TtlCache<TimeSeriesByVariable>>,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            ttl,
            timeout,
            noise: None,
        }
    }

    pub fn with_noise(mut self, noise: Option<NoiseConfig>) -> Self {
        self.noise = noise;
        self
    }

    pub fn cache_key(coordinate: &Coordinate, range: &DateRange) -> String {
        format!("point:{}:{}", coordinate, range)
    }

    /// Never fails: upstream problems come back as [`PointResult::Failure`].
    /// Only successes are cached.
    pub async fn fetch_point(&self, coordinate: Coordinate, range: &DateRange) -> PointResult {
        let key = Self::cache_key(&coordinate, range);
        if let Some(series) = self.cache.get(&key) {
            debug!("point cache hit: {}", key);
            return PointResult::Success { coordinate, series };
        }

        match self.fetch_upstream(&coordinate, range).await {
            Ok(mut series) => {
                if let Some(noise) = &self.noise {
                    noise.apply(&mut series);
                }
                self.cache.put(key, series.clone(), self.ttl);
                PointResult::Success { coordinate, series }
            }
            Err(err) => {
                warn!("point {} failed: {}", coordinate, err);
                PointResult::Failure {
                    coordinate,
                    error: err.to_string(),
                }
            }
        }
    }

    async fn fetch_upstream(
        &self,
        coordinate: &Coordinate,
        range: &DateRange,
    ) -> Result<TimeSeriesByVariable, UpstreamError> {
        tokio::time::timeout(
            self.timeout,
            self.provider.fetch_point_series(coordinate, range),
        )
        .await
        .map_err(|_| UpstreamError::Timeout(self.timeout.as_secs()))?
    }
}
