use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Writes `df` as comma-delimited UTF-8 with a header row.
///
/// Data goes to a `.tmp` sibling first and is renamed into place, so a
/// crashed run never leaves a truncated `.csv` for discovery to pick up.
pub(crate) fn write_csv(path: &Path, df: &mut DataFrame) -> Result<(), WriteError> {
    let tmp = tmp_path(path);
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        CsvWriter::new(&mut writer)
            .include_header(true)
            .with_separator(b',')
            .finish(df)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
