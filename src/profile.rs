use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dataset::{Dataset, PlayerKey};
use crate::error::{EngineError, EngineResult};
use crate::percentile::{MetricPercentile, metric_percentile_at};

pub const STRENGTH_THRESHOLD: f64 = 80.0;
pub const WEAKNESS_THRESHOLD: f64 = 20.0;

/// Overall label derived from the mean percentile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Elite,
    Notable,
    Average,
    Developing,
}

// Highest threshold first; the first match wins.
const TIER_TABLE: [(f64, Tier); 3] = [
    (80.0, Tier::Elite),
    (60.0, Tier::Notable),
    (40.0, Tier::Average),
];

impl Tier {
    pub fn from_mean(mean_percentile: f64) -> Self {
        TIER_TABLE
            .iter()
            .find(|(threshold, _)| mean_percentile >= *threshold)
            .map(|(_, tier)| *tier)
            .unwrap_or(Tier::Developing)
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Elite => "elite",
            Tier::Notable => "notable",
            Tier::Average => "average",
            Tier::Developing => "developing",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedMetric {
    pub metric: String,
    pub reason: EngineError,
}

impl Serialize for SkippedMetric {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("SkippedMetric", 2)?;
        s.serialize_field("metric", &self.metric)?;
        s.serialize_field("reason", &self.reason.to_string())?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfile {
    pub player: PlayerKey,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub percentiles: Vec<MetricPercentile>,
    pub skipped: Vec<SkippedMetric>,
    pub mean_percentile: f64,
    pub tier: Tier,
}

/// Percentile every metric for one player and split the result into
/// strengths (>= 80) and weaknesses (<= 20). Metrics that cannot be
/// computed for the player are reported in `skipped`.
pub fn classify<S: AsRef<str>>(
    dataset: &Dataset,
    player: &PlayerKey,
    metrics: &[S],
) -> EngineResult<PlayerProfile> {
    if dataset.is_empty() {
        return Err(EngineError::EmptyDataset);
    }
    let idx = dataset.resolve(player)?;

    let mut percentiles = Vec::new();
    let mut skipped = Vec::new();
    for metric in metrics {
        let metric = metric.as_ref();
        match metric_percentile_at(dataset, idx, metric) {
            Ok(row) => percentiles.push(row),
            Err(reason) => {
                warn!(metric, %reason, "metric skipped");
                skipped.push(SkippedMetric {
                    metric: metric.to_string(),
                    reason,
                });
            }
        }
    }

    if percentiles.is_empty() {
        return Err(EngineError::NoComputableMetrics);
    }

    let strengths = percentiles
        .iter()
        .filter(|p| p.percentile >= STRENGTH_THRESHOLD)
        .map(|p| p.metric.clone())
        .collect();
    let weaknesses = percentiles
        .iter()
        .filter(|p| p.percentile <= WEAKNESS_THRESHOLD)
        .map(|p| p.metric.clone())
        .collect();
    let mean_percentile =
        percentiles.iter().map(|p| p.percentile).sum::<f64>() / percentiles.len() as f64;

    Ok(PlayerProfile {
        player: dataset.records()[idx].key(),
        strengths,
        weaknesses,
        percentiles,
        skipped,
        mean_percentile,
        tier: Tier::from_mean(mean_percentile),
    })
}
