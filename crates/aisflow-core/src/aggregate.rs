use std::path::{Path, PathBuf};

use aisflow_parser::schema::BASE_DATE_TIME;
use aisflow_parser::{read_delimited, ParserError, COMMA};
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::output::{write_csv, WriteError};

pub const DATASET_PREFIX: &str = "dataset_";

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("failed to read transformed file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ParserError,
    },
    #[error("dataset {index} has rows but no BaseDateTime column to sort by")]
    MissingSortKey { index: usize },
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("failed to write dataset {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: WriteError,
    },
}

/// A written output dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetFile {
    pub index: usize,
    pub path: PathBuf,
    pub rows: usize,
}

/// `<output_dir>/dataset_<index>.csv`
pub fn dataset_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir.join(format!("{DATASET_PREFIX}{index}.csv"))
}

/// Accumulates whole tables and rolls them over into numbered, sorted
/// dataset files.
///
/// The cap is soft: it is checked after each appended table, so a flushed
/// dataset can exceed `max_rows_per_file` by up to one table's rows.
#[derive(Debug)]
pub struct BoundedAggregator {
    output_dir: PathBuf,
    max_rows_per_file: usize,
    batch: Option<DataFrame>,
    next_index: usize,
}

impl BoundedAggregator {
    pub fn new(output_dir: impl Into<PathBuf>, max_rows_per_file: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_rows_per_file,
            batch: None,
            next_index: 1,
        }
    }

    pub fn buffered_rows(&self) -> usize {
        self.batch.as_ref().map_or(0, DataFrame::height)
    }

    /// Index the next flushed dataset will get.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Appends all rows of `frame`, flushing when the batch reaches the cap.
    pub fn push(&mut self, frame: DataFrame) -> Result<Option<DatasetFile>, AggregateError> {
        if frame.height() == 0 {
            return Ok(None);
        }

        if let Some(batch) = self.batch.as_mut() {
            append_aligned(batch, frame)?;
        } else {
            self.batch = Some(frame);
        }

        if self.buffered_rows() >= self.max_rows_per_file {
            self.flush()
        } else {
            Ok(None)
        }
    }

    /// Sorts and writes the current batch, then starts a new one.
    pub fn flush(&mut self) -> Result<Option<DatasetFile>, AggregateError> {
        let Some(batch) = self.batch.take() else {
            return Ok(None);
        };
        if batch.height() == 0 {
            return Ok(None);
        }

        let index = self.next_index;
        if batch.get_column_index(BASE_DATE_TIME).is_none() {
            return Err(AggregateError::MissingSortKey { index });
        }

        let mut sorted = batch.sort(
            [BASE_DATE_TIME],
            SortMultipleOptions::default()
                .with_maintain_order(true)
                .with_nulls_last(true),
        )?;
        drop(batch);

        let path = dataset_path(&self.output_dir, index);
        write_csv(&path, &mut sorted).map_err(|source| AggregateError::Write {
            path: path.clone(),
            source,
        })?;

        let rows = sorted.height();
        info!(index, rows, path = %path.display(), "wrote dataset");

        self.next_index += 1;
        Ok(Some(DatasetFile { index, path, rows }))
    }

    /// Flushes whatever is left, however small.
    pub fn finish(mut self) -> Result<Option<DatasetFile>, AggregateError> {
        self.flush()
    }
}

/// Stacks `frame` under `batch`, widening both to the union of their columns.
/// Columns keep first-seen order and missing values are null.
fn append_aligned(batch: &mut DataFrame, mut frame: DataFrame) -> PolarsResult<()> {
    for name in frame.get_column_names_owned() {
        if batch.get_column_index(name.as_str()).is_none() {
            let height = batch.height();
            batch.with_column(Series::full_null(name, height, &DataType::String))?;
        }
    }
    for name in batch.get_column_names_owned() {
        if frame.get_column_index(name.as_str()).is_none() {
            let height = frame.height();
            frame.with_column(Series::full_null(name, height, &DataType::String))?;
        }
    }

    let aligned = frame.select(batch.get_column_names_owned())?;
    batch.vstack_mut(&aligned)?;
    Ok(())
}

/// Feeds transformed files to a [`BoundedAggregator`] in the order given.
pub fn aggregate_files(
    files: &[PathBuf],
    output_dir: &Path,
    max_rows_per_file: usize,
) -> Result<Vec<DatasetFile>, AggregateError> {
    let mut aggregator = BoundedAggregator::new(output_dir, max_rows_per_file);
    let mut datasets = Vec::new();

    for path in files {
        let frame = read_delimited(path, COMMA).map_err(|source| AggregateError::Read {
            path: path.clone(),
            source,
        })?;
        if let Some(dataset) = aggregator.push(frame)? {
            datasets.push(dataset);
        }
    }

    if let Some(dataset) = aggregator.finish()? {
        datasets.push(dataset);
    }

    Ok(datasets)
}
