use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{error, info, warn};

use crate::aggregate::{aggregate_files, DatasetFile};
use crate::config::{FailurePolicy, PipelineConfig};
use crate::discovery::{discover_datasets, discover_inputs, discover_transformed};
use crate::error::{PipelineError, Result};
use crate::manifest::{write_manifest, FailedFile, RunSummary};
use crate::transform::{transform_file, transformed_path, TransformError, TransformOutcome};

#[derive(Debug, Default)]
pub struct TransformReport {
    /// Successful transforms, in input file name order.
    pub outcomes: Vec<TransformOutcome>,
    pub failed: Vec<FailedFile>,
}

impl TransformReport {
    /// Output paths sorted by file name, the order aggregation consumes them.
    pub fn transformed_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.outcomes.iter().map(|o| o.output.clone()).collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        files
    }
}

/// Transforms every input file on a pool of `config.workers` threads.
///
/// Each file is handled start to finish by one task. Under
/// [`FailurePolicy::Abort`] the first failure (by file name) is returned after
/// all tasks have finished.
pub fn transform_all(config: &PipelineConfig) -> Result<TransformReport> {
    config.validate()?;
    fs::create_dir_all(&config.intermediate_dir)?;

    let inputs = discover_inputs(&config.input_dir, config.extension())?;
    info!(
        files = inputs.len(),
        workers = config.workers,
        input_dir = %config.input_dir.display(),
        "transforming input files"
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|index| format!("aisflow-transform-{index}"))
        .build()?;

    let intermediate_dir = config.intermediate_dir.as_path();
    let results: Vec<std::result::Result<TransformOutcome, TransformError>> = pool.install(|| {
        inputs
            .par_iter()
            .map(|input| transform_file(input, intermediate_dir))
            .collect()
    });

    collect_results(results, config.failure_policy, intermediate_dir)
}

fn collect_results(
    results: Vec<std::result::Result<TransformOutcome, TransformError>>,
    policy: FailurePolicy,
    intermediate_dir: &Path,
) -> Result<TransformReport> {
    let total = results.len();
    let mut report = TransformReport::default();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        let retained: usize = report.outcomes.iter().map(|o| o.filter.rows_out).sum();
        info!(files = total, rows_retained = retained, "transform complete");
        return Ok(report);
    }

    match policy {
        FailurePolicy::Abort => {
            let failed = errors.len();
            for err in &errors {
                error!(input = %err.path().display(), error = %err, "transform failed");
            }
            let first = errors.remove(0);
            Err(PipelineError::Transform {
                failed,
                total,
                source: first,
            })
        }
        FailurePolicy::Skip => {
            for err in errors {
                error!(input = %err.path().display(), error = %err, "skipping file");
                let stale = transformed_path(err.path(), intermediate_dir);
                if stale.is_file() {
                    fs::remove_file(&stale)?;
                }
                report.failed.push(FailedFile {
                    input: err.path().to_path_buf(),
                    error: err.to_string(),
                });
            }
            warn!(
                skipped = report.failed.len(),
                transformed = report.outcomes.len(),
                "continuing with partial input"
            );
            Ok(report)
        }
    }
}

/// Deletes `dataset_*.csv` left over from an earlier run.
fn clear_stale_datasets(output_dir: &Path) -> Result<()> {
    for stale in discover_datasets(output_dir)? {
        warn!(path = %stale.display(), "removing stale dataset");
        fs::remove_file(&stale)?;
    }
    Ok(())
}

fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    clear_stale_datasets(output_dir)
}

/// Aggregates every transformed file already in the intermediate directory.
pub fn aggregate_only(config: &PipelineConfig) -> Result<Vec<DatasetFile>> {
    config.validate()?;
    prepare_output_dir(&config.output_dir)?;

    let files = discover_transformed(&config.intermediate_dir)?;
    info!(files = files.len(), "aggregating transformed files");
    Ok(aggregate_files(
        &files,
        &config.output_dir,
        config.max_rows_per_file,
    )?)
}

/// Full batch: transform all inputs, aggregate what this run produced, and
/// record the run manifest in the output directory.
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    let started_at = Utc::now();

    let report = transform_all(config)?;
    prepare_output_dir(&config.output_dir)?;

    let files = report.transformed_files();
    info!(files = files.len(), max_rows_per_file = config.max_rows_per_file, "aggregating");
    let datasets = aggregate_files(&files, &config.output_dir, config.max_rows_per_file)?;

    let summary = RunSummary {
        started_at,
        finished_at: Utc::now(),
        config: config.clone(),
        files: report.outcomes,
        failed: report.failed,
        datasets,
    };
    let manifest = write_manifest(&config.output_dir, &summary)?;
    info!(
        datasets = summary.datasets.len(),
        rows = summary.rows_written(),
        manifest = %manifest.display(),
        "run complete"
    );

    Ok(summary)
}
