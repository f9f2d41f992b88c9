use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::series::{
    is_present, round_to, AggregateResult, Coordinate, DateRange, PointFailure, PointResult,
    TimeSeriesByVariable, VariableStat, STAT_PRECISION,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatisticsMode {
    /// Only `mean` and `count` per cell.
    MeanOnly,
    #[default]
    Full,
}

impl fmt::Display for StatisticsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatisticsMode::MeanOnly => write!(f, "mean-only"),
            StatisticsMode::Full => write!(f, "full"),
        }
    }
}

impl FromStr for StatisticsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean-only" | "mean" => Ok(StatisticsMode::MeanOnly),
            "full" => Ok(StatisticsMode::Full),
            other => Err(format!(
                "unknown statistics mode '{}', expected 'full' or 'mean-only'",
                other
            )),
        }
    }
}

type Cells = BTreeMap<String, BTreeMap<String, VariableStat>>;

/// Reduces per-point series into per-variable, per-date statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    mode: StatisticsMode,
}

impl Aggregator {
    pub fn new(mode: StatisticsMode) -> Self {
        Self { mode }
    }

    /// Statistics over every successful point. Cells are built only from
    /// points that reported a value for that exact variable and date.
    pub fn aggregate(
        &self,
        center: Coordinate,
        range: &DateRange,
        results: &[PointResult],
    ) -> AggregateResult {
        let mut samples: BTreeMap<&str, BTreeMap<&str, Vec<f64>>> = BTreeMap::new();
        let mut sampled_points = Vec::new();
        for result in results {
            let PointResult::Success { coordinate, series } = result else {
                continue;
            };
            sampled_points.push(*coordinate);
            for (variable, dates) in series {
                let cells = samples.entry(variable.as_str()).or_default();
                for (date, value) in dates {
                    if is_present(*value) {
                        cells.entry(date.as_str()).or_default().push(*value);
                    }
                }
            }
        }

        let per_variable_stats: Cells = samples
            .into_iter()
            .map(|(variable, dates)| {
                let stats = dates
                    .into_iter()
                    .filter_map(|(date, values)| {
                        describe(&values, self.mode).map(|stat| (date.to_string(), stat))
                    })
                    .collect();
                (variable.to_string(), stats)
            })
            .collect();

        self.finish(center, range, sampled_points, per_variable_stats, results)
    }

    /// Reshapes one point's raw series into the aggregate contract with
    /// `count = 1` wherever a value exists.
    pub fn single_point(
        &self,
        center: Coordinate,
        range: &DateRange,
        results: &[PointResult],
    ) -> AggregateResult {
        let success = results.iter().find_map(|result| match result {
            PointResult::Success { coordinate, series } => Some((*coordinate, series)),
            PointResult::Failure { .. } => None,
        });

        let (sampled_points, per_variable_stats) = match success {
            Some((coordinate, series)) => (vec![coordinate], self.reshape(series)),
            None => (Vec::new(), Cells::new()),
        };

        self.finish(center, range, sampled_points, per_variable_stats, results)
    }

    fn reshape(&self, series: &TimeSeriesByVariable) -> Cells {
        series
            .iter()
            .map(|(variable, dates)| {
                let stats = dates
                    .iter()
                    .filter(|(_, value)| is_present(**value))
                    .map(|(date, value)| {
                        let value = round_to(*value, STAT_PRECISION);
                        let stat = match self.mode {
                            StatisticsMode::Full => VariableStat {
                                mean: value,
                                stddev: Some(0.0),
                                min: Some(value),
                                max: Some(value),
                                count: 1,
                            },
                            StatisticsMode::MeanOnly => VariableStat {
                                mean: value,
                                stddev: None,
                                min: None,
                                max: None,
                                count: 1,
                            },
                        };
                        (date.clone(), stat)
                    })
                    .collect();
                (variable.clone(), stats)
            })
            .collect()
    }

    fn finish(
        &self,
        center: Coordinate,
        range: &DateRange,
        sampled_points: Vec<Coordinate>,
        per_variable_stats: Cells,
        results: &[PointResult],
    ) -> AggregateResult {
        // YYYYMMDD is fixed width, so string order is date order
        let latest_date = per_variable_stats
            .values()
            .flat_map(|dates| dates.keys())
            .max()
            .cloned();

        let latest_by_variable = per_variable_stats
            .iter()
            .map(|(variable, dates)| {
                let latest = latest_date
                    .as_ref()
                    .and_then(|date| dates.get(date))
                    .map(|stat| stat.mean);
                (variable.clone(), latest)
            })
            .collect();

        let failed_points: Vec<PointFailure> =
            results.iter().filter_map(PointResult::failure).collect();

        AggregateResult {
            center,
            sampled_points,
            range: range.clone(),
            latest_date,
            per_variable_stats,
            latest_by_variable,
            failed_points,
        }
    }
}

/// Mean, population standard deviation, min, max and count, rounded for
/// presentation. `None` for an empty cell.
fn describe(values: &[f64], mode: StatisticsMode) -> Option<VariableStat> {
    if values.is_empty() {
        return None;
    }

    // Welford's online algorithm
    let mut mean = 0.0f64;
    let mut m2 = 0.0f64;
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &value in values {
        count += 1;
        let delta = value - mean;
        mean += delta / count as f64;
        m2 += delta * (value - mean);
        min = min.min(value);
        max = max.max(value);
    }

    let round = |v: f64| round_to(v, STAT_PRECISION);
    Some(match mode {
        StatisticsMode::Full => VariableStat {
            mean: round(mean),
            stddev: Some(round((m2 / count as f64).sqrt())),
            min: Some(round(min)),
            max: Some(round(max)),
            count,
        },
        StatisticsMode::MeanOnly => VariableStat {
            mean: round(mean),
            stddev: None,
            min: None,
            max: None,
            count,
        },
    })
}
