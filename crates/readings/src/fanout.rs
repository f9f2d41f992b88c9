use futures::future::join_all;
use log::{error, info};
use std::sync::Arc;

use crate::{
    error::SamplerError,
    fetcher::PointFetcher,
    series::{Coordinate, DateRange, PointFailure, PointResult},
};

/// Fetches every coordinate concurrently and waits for all of them to settle.
///
/// Results come back in input order. Each fetch runs as its own runtime task,
/// so dropping the returned future does not stop fetches already in flight;
/// they finish and still populate the point cache. Fails only when no
/// coordinate succeeded.
pub async fn fetch_all(
    fetcher: Arc<PointFetcher>,
    coordinates: &[Coordinate],
    range: &DateRange,
) -> Result<Vec<PointResult>, SamplerError> {
    let tasks = coordinates.iter().map(|&coordinate| {
        let fetcher = Arc::clone(&fetcher);
        let range = range.clone();
        let handle = tokio::spawn(async move { fetcher.fetch_point(coordinate, &range).await });
        async move {
            handle.await.unwrap_or_else(|e| PointResult::Failure {
                coordinate,
                error: format!("fetch task failed: {}", e),
            })
        }
    });
    let results = join_all(tasks).await;

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    info!(
        "fetched {}/{} grid points for {}",
        succeeded,
        results.len(),
        range
    );

    if succeeded == 0 {
        let failures: Vec<PointFailure> = results.iter().filter_map(PointResult::failure).collect();
        error!("every grid point failed for {}", range);
        return Err(SamplerError::TotalFailure { failures });
    }
    Ok(results)
}
