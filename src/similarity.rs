use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Dataset, PlayerKey};
use crate::error::{EngineError, EngineResult};

/// Standard deviations at or below this are treated as zero variance.
const STD_EPSILON: f64 = 1e-9;
const NORM_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Euclidean,
}

impl SimilarityMetric {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "cosine" | "cos" => Some(SimilarityMetric::Cosine),
            "euclidean" | "euclid" | "distance" => Some(SimilarityMetric::Euclidean),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityOptions {
    pub top_n: usize,
    pub metric: SimilarityMetric,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            top_n: 5,
            metric: SimilarityMetric::Cosine,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub player: PlayerKey,
    /// Row index in the dataset the ranking was computed on.
    pub index: usize,
    /// The ranking score: cosine in [-1, 1] or Euclidean similarity in [0, 100].
    pub score: f64,
    pub cosine: Option<f64>,
    pub distance: f64,
    pub euclidean_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub feature: String,
    pub mean: f64,
    /// Population standard deviation (n denominator).
    pub std_dev: f64,
    pub count: usize,
}

impl FeatureStats {
    fn from_values(feature: &str, column: &[Option<f64>]) -> Self {
        let values: Vec<f64> = column.iter().flatten().copied().collect();
        if values.is_empty() {
            return Self {
                feature: feature.to_string(),
                mean: 0.0,
                std_dev: 0.0,
                count: 0,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values
            .iter()
            .map(|v| {
                let d = v - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Self {
            feature: feature.to_string(),
            mean,
            std_dev: var.sqrt(),
            count: values.len(),
        }
    }

    /// Zero-variance features contribute 0.
    pub fn zscore(&self, v: f64) -> f64 {
        if self.std_dev <= STD_EPSILON {
            0.0
        } else {
            (v - self.mean) / self.std_dev
        }
    }
}

/// Z-scored view of the selected features over the whole dataset.
#[derive(Debug, Clone)]
pub struct Standardized {
    stats: Vec<FeatureStats>,
    // [feature][record]
    z: Vec<Vec<Option<f64>>>,
}

impl Standardized {
    pub fn stats(&self) -> &[FeatureStats] {
        &self.stats
    }

    pub fn z(&self, record: usize, feature: usize) -> Option<f64> {
        self.z.get(feature).and_then(|col| col.get(record).copied().flatten())
    }

    /// `None` when the record lacks any selected feature.
    pub fn vector(&self, record: usize) -> Option<Vec<f64>> {
        self.z
            .iter()
            .map(|col| col.get(record).copied().flatten())
            .collect()
    }

    pub fn column(&self, feature: usize) -> &[Option<f64>] {
        self.z.get(feature).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub fn standardize<S: AsRef<str>>(dataset: &Dataset, features: &[S]) -> EngineResult<Standardized> {
    if features.is_empty() {
        return Err(EngineError::EmptyFeatureSet);
    }
    let mut stats = Vec::with_capacity(features.len());
    let mut z = Vec::with_capacity(features.len());
    for feature in features {
        let feature = feature.as_ref();
        let column = dataset.numeric_column(feature)?;
        let fs = FeatureStats::from_values(feature, &column);
        z.push(column.iter().map(|v| v.map(|v| fs.zscore(v))).collect());
        stats.push(fs);
    }
    Ok(Standardized { stats, z })
}

/// `None` when either vector has zero length.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a <= NORM_EPSILON || norm_b <= NORM_EPSILON {
        return None;
    }
    Some((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Players most similar to `reference` by cosine similarity of z-scored
/// features.
pub fn rank_similar<S: AsRef<str>>(
    dataset: &Dataset,
    reference: &PlayerKey,
    features: &[S],
    top_n: usize,
) -> EngineResult<Vec<SimilarityResult>> {
    rank_similar_with(
        dataset,
        reference,
        features,
        &SimilarityOptions {
            top_n,
            metric: SimilarityMetric::Cosine,
        },
    )
}

pub fn rank_similar_with<S: AsRef<str>>(
    dataset: &Dataset,
    reference: &PlayerKey,
    features: &[S],
    options: &SimilarityOptions,
) -> EngineResult<Vec<SimilarityResult>> {
    if features.is_empty() {
        return Err(EngineError::EmptyFeatureSet);
    }
    if options.top_n < 1 {
        return Err(EngineError::InvalidTopN(options.top_n));
    }
    if dataset.is_empty() {
        return Err(EngineError::EmptyDataset);
    }

    let mut seen = HashSet::new();
    let features: Vec<&str> = features
        .iter()
        .map(|f| f.as_ref())
        .filter(|f| seen.insert(*f))
        .collect();

    let ref_idx = dataset.resolve(reference)?;
    let standardized = standardize(dataset, &features)?;

    let mut ref_vec = Vec::with_capacity(features.len());
    for (fi, feature) in features.iter().enumerate() {
        let Some(z) = standardized.z(ref_idx, fi) else {
            return Err(EngineError::MissingReferenceFeature {
                player: reference.to_string(),
                feature: feature.to_string(),
            });
        };
        ref_vec.push(z);
    }
    let ref_zero = norm(&ref_vec) <= NORM_EPSILON;
    if ref_zero && options.metric == SimilarityMetric::Cosine {
        return Err(EngineError::ZeroReferenceVector {
            player: reference.to_string(),
        });
    }

    // (index, cosine, distance)
    let mut candidates: Vec<(usize, Option<f64>, f64)> = Vec::new();
    let mut incomplete = 0usize;
    for idx in 0..dataset.len() {
        if idx == ref_idx {
            continue;
        }
        let Some(vec) = standardized.vector(idx) else {
            incomplete += 1;
            continue;
        };
        let cosine = cosine_similarity(&ref_vec, &vec);
        let distance = euclidean_distance(&ref_vec, &vec);
        candidates.push((idx, cosine, distance));
    }

    let max_distance = candidates.iter().map(|c| c.2).fold(0.0_f64, f64::max);

    let mut results: Vec<SimilarityResult> = candidates
        .into_iter()
        .filter_map(|(idx, cosine, distance)| {
            let euclidean_similarity = if max_distance <= 0.0 {
                100.0
            } else {
                100.0 * (1.0 - distance / max_distance)
            };
            let score = match options.metric {
                SimilarityMetric::Cosine => cosine?,
                SimilarityMetric::Euclidean => euclidean_similarity,
            };
            Some(SimilarityResult {
                player: dataset.records()[idx].key(),
                index: idx,
                score,
                cosine,
                distance,
                euclidean_similarity,
            })
        })
        .collect();

    debug!(
        features = features.len(),
        candidates = results.len(),
        incomplete,
        "similarity ranking"
    );

    // Stable: equal scores keep dataset order.
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(options.top_n);
    Ok(results)
}
