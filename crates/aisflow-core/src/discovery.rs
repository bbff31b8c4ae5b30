use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use thiserror::Error;

use crate::aggregate::DATASET_PREFIX;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
    #[error("directory {} is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list directory entry: {0}")]
    Glob(#[from] glob::GlobError),
}

/// Lists regular files in `dir` matching `file_pattern`, sorted by file name.
///
/// The sort makes the order independent of how the filesystem happens to
/// enumerate entries; aggregation relies on it.
pub fn discover(dir: &Path, file_pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !dir.is_dir() {
        return Err(DiscoveryError::MissingDirectory(dir.to_path_buf()));
    }
    let dir_str = dir
        .to_str()
        .ok_or_else(|| DiscoveryError::NonUtf8Path(dir.to_path_buf()))?;
    let pattern = format!("{}/{}", Pattern::escape(dir_str), file_pattern);

    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn discover_inputs(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    discover(dir, &format!("*.{}", Pattern::escape(extension)))
}

pub fn discover_transformed(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    discover(dir, "*.csv")
}

pub fn discover_datasets(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    discover(dir, &format!("{DATASET_PREFIX}*.csv"))
}
