use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, PlayerKey};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: String,
    pub a: f64,
    pub b: f64,
    pub difference: f64,
    /// `(a / b - 1) * 100`; `None` when `b` is zero.
    pub difference_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarPoint {
    pub metric: String,
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub metric: String,
    pub values: Vec<Option<f64>>,
    /// Column of the highest value; first one wins on ties.
    pub best: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMatrix {
    pub players: Vec<PlayerKey>,
    pub rows: Vec<MatrixRow>,
}

/// Head-to-head table for two players. Both must have a value for every
/// metric.
pub fn compare_players<S: AsRef<str>>(
    dataset: &Dataset,
    a: &PlayerKey,
    b: &PlayerKey,
    metrics: &[S],
) -> EngineResult<Vec<MetricComparison>> {
    if metrics.is_empty() {
        return Err(EngineError::EmptyFeatureSet);
    }
    let ia = dataset.resolve(a)?;
    let ib = dataset.resolve(b)?;

    let mut rows = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let metric = metric.as_ref();
        let column = dataset.numeric_column(metric)?;
        let va = required(&column, ia, a, metric)?;
        let vb = required(&column, ib, b, metric)?;
        let difference_pct = if vb == 0.0 {
            None
        } else {
            Some((va / vb - 1.0) * 100.0)
        };
        rows.push(MetricComparison {
            metric: metric.to_string(),
            a: va,
            b: vb,
            difference: va - vb,
            difference_pct,
        });
    }
    Ok(rows)
}

fn required(column: &[Option<f64>], idx: usize, player: &PlayerKey, metric: &str) -> EngineResult<f64> {
    column
        .get(idx)
        .copied()
        .flatten()
        .ok_or_else(|| EngineError::MissingValue {
            player: player.to_string(),
            metric: metric.to_string(),
        })
}

/// Scales each metric pair by its larger value so both fit a 0-1 radar.
pub fn radar_profile(rows: &[MetricComparison]) -> Vec<RadarPoint> {
    rows.iter()
        .map(|row| {
            let max = row.a.max(row.b);
            if max > 0.0 {
                RadarPoint {
                    metric: row.metric.clone(),
                    a: row.a / max,
                    b: row.b / max,
                }
            } else {
                RadarPoint {
                    metric: row.metric.clone(),
                    a: row.a,
                    b: row.b,
                }
            }
        })
        .collect()
}

/// Metrics as rows, players as columns. Missing values are kept as `None`.
pub fn comparison_matrix<S: AsRef<str>>(
    dataset: &Dataset,
    players: &[PlayerKey],
    metrics: &[S],
) -> EngineResult<ComparisonMatrix> {
    if metrics.is_empty() {
        return Err(EngineError::EmptyFeatureSet);
    }
    let indices = players
        .iter()
        .map(|p| dataset.resolve(p))
        .collect::<EngineResult<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let metric = metric.as_ref();
        let column = dataset.numeric_column(metric)?;
        let values: Vec<Option<f64>> = indices.iter().map(|i| column[*i]).collect();
        let mut best: Option<(usize, f64)> = None;
        for (col, v) in values.iter().enumerate() {
            let Some(v) = *v else { continue };
            if best.is_none_or(|(_, b)| v > b) {
                best = Some((col, v));
            }
        }
        rows.push(MatrixRow {
            metric: metric.to_string(),
            values,
            best: best.map(|(col, _)| col),
        });
    }

    Ok(ComparisonMatrix {
        players: indices.iter().map(|i| dataset.records()[*i].key()).collect(),
        rows,
    })
}
