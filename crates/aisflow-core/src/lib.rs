pub mod aggregate;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod manifest;
mod output;
pub mod pipeline;
pub mod timestamp;
pub mod transform;

pub use aggregate::{aggregate_files, BoundedAggregator, DatasetFile};
pub use config::{FailurePolicy, PipelineConfig};
pub use error::{PipelineError, Result};
pub use manifest::RunSummary;
pub use output::WriteError;
pub use pipeline::{aggregate_only, run, transform_all, TransformReport};
pub use transform::{transform_file, TransformOutcome};
