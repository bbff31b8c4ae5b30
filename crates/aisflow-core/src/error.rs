// crates/aisflow-core/src/error.rs

use thiserror::Error;

use crate::aggregate::AggregateError;
use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::transform::TransformError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("{failed} of {total} input files failed to transform; first failure: {source}")]
    Transform {
        failed: usize,
        total: usize,
        #[source]
        source: TransformError,
    },

    #[error("Aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
