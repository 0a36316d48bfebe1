use thiserror::Error;

/// Failures reported by the percentile, profile, similarity and comparison
/// operations. None of these are recovered inside the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("dataset has no records")]
    EmptyDataset,

    #[error("column `{column}` is not present in the dataset")]
    UnknownColumn { column: String },

    #[error("column `{column}` holds non-numeric values")]
    NonNumericColumn { column: String },

    #[error("player `{player}` not found")]
    ReferenceNotFound { player: String },

    #[error("player `{player}` matches {matches} records; add team or season")]
    AmbiguousPlayer { player: String, matches: usize },

    #[error("`{metric}` has no value for `{player}`")]
    MissingValue { player: String, metric: String },

    #[error("reference `{player}` has no value for feature `{feature}`")]
    MissingReferenceFeature { player: String, feature: String },

    #[error("none of the requested metrics could be computed")]
    NoComputableMetrics,

    #[error("feature set is empty")]
    EmptyFeatureSet,

    #[error("top_n must be at least 1 (got {0})")]
    InvalidTopN(usize),

    #[error("reference `{player}` standardizes to a zero vector; cosine similarity is undefined")]
    ZeroReferenceVector { player: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
