use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::DatasetFile;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::transform::TransformOutcome;

pub const MANIFEST_FILE_NAME: &str = "run_manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub input: PathBuf,
    pub error: String,
}

/// Everything one run did: per-file filter statistics, the files it had to
/// skip, and the datasets it wrote.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: PipelineConfig,
    pub files: Vec<TransformOutcome>,
    pub failed: Vec<FailedFile>,
    pub datasets: Vec<DatasetFile>,
}

impl RunSummary {
    pub fn rows_read(&self) -> usize {
        self.files.iter().map(|f| f.filter.rows_in).sum()
    }

    pub fn rows_retained(&self) -> usize {
        self.files.iter().map(|f| f.filter.rows_out).sum()
    }

    pub fn rows_written(&self) -> usize {
        self.datasets.iter().map(|d| d.rows).sum()
    }
}

pub fn write_manifest(output_dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
    let path = output_dir.join(MANIFEST_FILE_NAME);
    let bytes = serde_json::to_vec_pretty(summary)?;
    fs::write(&path, bytes)?;
    Ok(path)
}
