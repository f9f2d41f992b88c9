use log::{debug, warn};
use std::{sync::Arc, time::Duration};

use crate::{
    cache::TtlCache,
    error::UpstreamError,
    providers::{waqi::AirQualityReport, AirQualitySource},
    series::Coordinate,
};

/// Cached nearest-station air quality lookups.
pub struct AirQualityService {
    source: Arc<dyn AirQualitySource>,
    cache: TtlCache<AirQualityReport>,
    ttl: Duration,
    timeout: Duration,
}

impl AirQualityService {
    pub fn new(source: Arc<dyn AirQualitySource>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            source,
            cache: TtlCache::new(),
            ttl,
            timeout,
        }
    }

    pub async fn report_for(&self, lat: f64, lon: f64) -> Result<AirQualityReport, UpstreamError> {
        let coordinate = Coordinate::new(lat, lon);
        let key = format!("air:{}", coordinate);
        if let Some(report) = self.cache.get(&key) {
            debug!("air quality cache hit: {}", key);
            return Ok(report);
        }

        let report = tokio::time::timeout(self.timeout, self.source.fetch_air_quality(&coordinate))
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout.as_secs()))?
            .inspect_err(|e| warn!("air quality lookup for {} failed: {}", coordinate, e))?;

        self.cache.put(key, report.clone(), self.ttl);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        waqi::{AqiReading, Environment, Pollutants},
        MockAirQualitySource,
    };

    fn report(aqi: f64) -> AirQualityReport {
        AirQualityReport {
            coordinates: Some(Coordinate::new(-12.05, -77.03)),
            location: Some("Lima".to_string()),
            aqi: Some(aqi).into(),
            dominant: Some("pm25".to_string()),
            main_pollutants: Pollutants {
                pm25: Some(aqi).into(),
                pm10: AqiReading::from(None),
                co: AqiReading::from(None),
                no2: AqiReading::from(None),
                so2: AqiReading::from(None),
                o3: AqiReading::from(None),
            },
            environment: Environment::default(),
            time: None,
            source: "test".to_string(),
        }
    }

    fn service(source: MockAirQualitySource) -> AirQualityService {
        AirQualityService::new(
            Arc::new(source),
            Duration::from_secs(600),
            Duration::from_secs(8),
        )
    }

    #[tokio::test]
    async fn caches_successful_reports() {
        let mut source = MockAirQualitySource::new();
        source
            .expect_fetch_air_quality()
            .times(1)
            .returning(|_| Ok(report(42.0)));
        let service = service(source);

        let first = service.report_for(-12.05, -77.03).await.unwrap();
        let second = service.report_for(-12.05, -77.03).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.aqi.color, "green");
    }

    #[tokio::test]
    async fn failures_are_retried_on_next_call() {
        let mut source = MockAirQualitySource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_fetch_air_quality()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(UpstreamError::Malformed("Unknown station".to_string())));
        source
            .expect_fetch_air_quality()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(report(160.0)));
        let service = service(source);

        assert!(service.report_for(1.0, 1.0).await.is_err());
        let report = service.report_for(1.0, 1.0).await.unwrap();
        assert_eq!(report.aqi.color, "red");
    }
}
