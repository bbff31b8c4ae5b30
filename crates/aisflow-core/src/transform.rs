use std::fs;
use std::path::{Path, PathBuf};

use aisflow_parser::{normalize_schema, parse_delimited, ParserError, RenameReport, PIPE};
use blake3::Hasher;
use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::filter::{filter_rows, FilterStats};
use crate::output::{write_csv, WriteError};
use crate::timestamp::{canonicalize_timestamps, TimestampError};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParserError,
    },
    #[error("failed to filter {}: {source}", .path.display())]
    Filter {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("invalid timestamps in {}: {source}", .path.display())]
    Timestamp {
        path: PathBuf,
        #[source]
        source: TimestampError,
    },
    #[error("failed to write {} for {}: {source}", .output.display(), .input.display())]
    Write {
        input: PathBuf,
        output: PathBuf,
        #[source]
        source: WriteError,
    },
}

impl TransformError {
    /// The input file that failed, whichever stage it failed in.
    pub fn path(&self) -> &Path {
        match self {
            TransformError::Read { path, .. }
            | TransformError::Parse { path, .. }
            | TransformError::Filter { path, .. }
            | TransformError::Timestamp { path, .. } => path,
            TransformError::Write { input, .. } => input,
        }
    }
}

/// Result of transforming one input file.
#[derive(Debug, Clone, Serialize)]
pub struct TransformOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub content_hash: String,
    pub filter: FilterStats,
    pub renames: RenameReport,
    pub timestamps_rewritten: usize,
}

/// `<intermediate_dir>/<input stem>.csv`
pub fn transformed_path(input: &Path, intermediate_dir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut name = stem.to_os_string();
    name.push(".csv");
    intermediate_dir.join(name)
}

/// Parses, renames, filters and canonicalizes one pipe-delimited file, then
/// writes the surviving rows next to its siblings in `intermediate_dir`.
pub fn transform_file(
    input: &Path,
    intermediate_dir: &Path,
) -> Result<TransformOutcome, TransformError> {
    let bytes = fs::read(input).map_err(|source| TransformError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let content_hash = compute_hash(&bytes);

    let parse_err = |source: ParserError| TransformError::Parse {
        path: input.to_path_buf(),
        source,
    };
    let mut df = parse_delimited(bytes.as_slice(), PIPE).map_err(parse_err)?;
    let renames = normalize_schema(&mut df).map_err(parse_err)?;

    let (mut filtered, filter) = filter_rows(&df).map_err(|source| TransformError::Filter {
        path: input.to_path_buf(),
        source,
    })?;
    drop(df);

    let timestamps_rewritten =
        canonicalize_timestamps(&mut filtered).map_err(|source| TransformError::Timestamp {
            path: input.to_path_buf(),
            source,
        })?;

    let output = transformed_path(input, intermediate_dir);
    write_csv(&output, &mut filtered).map_err(|source| TransformError::Write {
        input: input.to_path_buf(),
        output: output.clone(),
        source,
    })?;

    debug!(
        input = %input.display(),
        output = %output.display(),
        rows_in = filter.rows_in,
        rows_out = filter.rows_out,
        "transformed file"
    );

    Ok(TransformOutcome {
        input: input.to_path_buf(),
        output,
        content_hash,
        filter,
        renames,
        timestamps_rewritten,
    })
}

fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}
