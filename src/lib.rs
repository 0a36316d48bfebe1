pub mod compare;
pub mod config;
pub mod dataset;
pub mod error;
pub mod http_cache;
pub mod http_client;
pub mod loader;
pub mod percentile;
pub mod positions;
pub mod profile;
pub mod report;
pub mod similarity;

pub use dataset::{Dataset, DatasetFilter, PlayerKey, PlayerRecord, Value};
pub use error::{EngineError, EngineResult};
