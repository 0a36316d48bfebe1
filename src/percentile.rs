use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Dataset, PlayerKey};
use crate::error::{EngineError, EngineResult};

/// Colour band used when percentiles are listed as bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PercentileBand {
    High,
    Mid,
    Low,
}

impl PercentileBand {
    pub fn from_percentile(p: f64) -> Self {
        if p >= 80.0 {
            PercentileBand::High
        } else if p >= 50.0 {
            PercentileBand::Mid
        } else {
            PercentileBand::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPercentile {
    pub metric: String,
    pub value: f64,
    pub percentile: f64,
    pub band: PercentileBand,
}

/// Distribution of one metric across the dataset plus where the player sits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1); `None` below two values.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub player_value: f64,
    /// 1-based position when sorted descending; ties share the better rank.
    pub rank: usize,
    pub total: usize,
}

/// Share of the non-null population at or below the player's value, 0-100.
pub fn percentile(dataset: &Dataset, player: &PlayerKey, metric: &str) -> EngineResult<f64> {
    if dataset.is_empty() {
        return Err(EngineError::EmptyDataset);
    }
    let idx = dataset.resolve(player)?;
    percentile_at(dataset, idx, metric)
}

pub(crate) fn percentile_at(dataset: &Dataset, idx: usize, metric: &str) -> EngineResult<f64> {
    let (column, v) = player_value(dataset, idx, metric)?;
    let p = percentile_of(&column, v);
    debug!(metric, value = v, percentile = p, "percentile");
    Ok(p)
}

/// Percentiles for several metrics; the first failing metric aborts.
pub fn percentile_table<S: AsRef<str>>(
    dataset: &Dataset,
    player: &PlayerKey,
    metrics: &[S],
) -> EngineResult<Vec<MetricPercentile>> {
    if metrics.is_empty() {
        return Err(EngineError::EmptyFeatureSet);
    }
    if dataset.is_empty() {
        return Err(EngineError::EmptyDataset);
    }
    let idx = dataset.resolve(player)?;
    metrics
        .iter()
        .map(|m| metric_percentile_at(dataset, idx, m.as_ref()))
        .collect()
}

pub(crate) fn metric_percentile_at(
    dataset: &Dataset,
    idx: usize,
    metric: &str,
) -> EngineResult<MetricPercentile> {
    let (column, value) = player_value(dataset, idx, metric)?;
    let percentile = percentile_of(&column, value);
    Ok(MetricPercentile {
        metric: metric.to_string(),
        value,
        percentile,
        band: PercentileBand::from_percentile(percentile),
    })
}

pub fn describe_metric(
    dataset: &Dataset,
    player: &PlayerKey,
    metric: &str,
) -> EngineResult<MetricSummary> {
    if dataset.is_empty() {
        return Err(EngineError::EmptyDataset);
    }
    let idx = dataset.resolve(player)?;
    describe_metric_at(dataset, idx, metric)
}

pub(crate) fn describe_metric_at(
    dataset: &Dataset,
    idx: usize,
    metric: &str,
) -> EngineResult<MetricSummary> {
    let (column, v) = player_value(dataset, idx, metric)?;
    let mut values: Vec<f64> = column.iter().flatten().copied().collect();
    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    };
    let std_dev = if n < 2 {
        None
    } else {
        let ss = values.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>();
        Some((ss / (n as f64 - 1.0)).sqrt())
    };
    let rank = values.iter().filter(|x| **x > v).count() + 1;

    Ok(MetricSummary {
        metric: metric.to_string(),
        count: n,
        mean,
        median,
        std_dev,
        min: values[0],
        max: values[n - 1],
        player_value: v,
        rank,
        total: n,
    })
}

fn player_value(
    dataset: &Dataset,
    idx: usize,
    metric: &str,
) -> EngineResult<(Vec<Option<f64>>, f64)> {
    let column = dataset.numeric_column(metric)?;
    let Some(v) = column.get(idx).copied().flatten() else {
        let player = dataset
            .record(idx)
            .map(|r| r.key().to_string())
            .unwrap_or_default();
        return Err(EngineError::MissingValue {
            player,
            metric: metric.to_string(),
        });
    };
    Ok((column, v))
}

/// `v` must come from `column`, so the population is never empty.
fn percentile_of(column: &[Option<f64>], v: f64) -> f64 {
    let mut total = 0usize;
    let mut at_or_below = 0usize;
    for x in column.iter().flatten() {
        total += 1;
        if *x <= v {
            at_or_below += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    100.0 * at_or_below as f64 / total as f64
}
