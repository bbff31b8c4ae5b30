use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_ROWS_PER_FILE: usize = 1_000_000;

pub const ENV_INPUT_DIR: &str = "AISFLOW_INPUT_DIR";
pub const ENV_INTERMEDIATE_DIR: &str = "AISFLOW_INTERMEDIATE_DIR";
pub const ENV_OUTPUT_DIR: &str = "AISFLOW_OUTPUT_DIR";
pub const ENV_INPUT_EXTENSION: &str = "AISFLOW_INPUT_EXTENSION";
pub const ENV_MAX_ROWS_PER_FILE: &str = "AISFLOW_MAX_ROWS_PER_FILE";
pub const ENV_WORKERS: &str = "AISFLOW_WORKERS";
pub const ENV_FAILURE_POLICY: &str = "AISFLOW_FAILURE_POLICY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value '{value}' for {key}: {message}")]
    InvalidValue {
        key: &'static str,
        value: String,
        message: String,
    },
}

/// What to do when a single input file cannot be transformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run with the first failure once all workers finish.
    #[default]
    Abort,
    /// Log the failure, record it in the manifest and carry on.
    Skip,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Skip => f.write_str("skip"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(format!("unknown failure policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub intermediate_dir: PathBuf,
    pub output_dir: PathBuf,
    pub input_extension: String,
    pub max_rows_per_file: usize,
    pub workers: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("AIS_Sines"),
            intermediate_dir: PathBuf::from("CSV"),
            output_dir: PathBuf::from("Combined_CSV"),
            input_extension: "txt".to_string(),
            max_rows_per_file: DEFAULT_MAX_ROWS_PER_FILE,
            workers: default_workers(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Overrides fields from `AISFLOW_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overrides fields from any key lookup using the `AISFLOW_*` names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_INPUT_DIR) {
            self.input_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_INTERMEDIATE_DIR) {
            self.intermediate_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_INPUT_EXTENSION) {
            self.input_extension = value;
        }
        if let Some(value) = lookup(ENV_MAX_ROWS_PER_FILE) {
            self.max_rows_per_file = parse_count(ENV_MAX_ROWS_PER_FILE, &value)?;
        }
        if let Some(value) = lookup(ENV_WORKERS) {
            self.workers = parse_count(ENV_WORKERS, &value)?;
        }
        if let Some(value) = lookup(ENV_FAILURE_POLICY) {
            self.failure_policy =
                value
                    .parse()
                    .map_err(|message| ConfigError::InvalidValue {
                        key: ENV_FAILURE_POLICY,
                        value: value.clone(),
                        message,
                    })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rows_per_file == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_rows_per_file",
                value: "0".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "workers",
                value: "0".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        let extension = self.input_extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "input_extension",
                value: self.input_extension.clone(),
                message: "must not be empty".to_string(),
            });
        }
        if extension.eq_ignore_ascii_case("csv") && self.input_dir == self.intermediate_dir {
            return Err(ConfigError::InvalidValue {
                key: "intermediate_dir",
                value: self.intermediate_dir.display().to_string(),
                message: "would overwrite the .csv inputs in place".to_string(),
            });
        }
        Ok(())
    }

    /// Extension without a leading dot.
    pub fn extension(&self) -> &str {
        self.input_extension.trim_start_matches('.')
    }
}

fn parse_count(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            message: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_reference_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.input_dir, PathBuf::from("AIS_Sines"));
        assert_eq!(config.intermediate_dir, PathBuf::from("CSV"));
        assert_eq!(config.output_dir, PathBuf::from("Combined_CSV"));
        assert_eq!(config.max_rows_per_file, 1_000_000);
        assert!(config.workers >= 1);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        config.validate().unwrap();
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
                input_dir = "raw"
                max_rows_per_file = 500
                failure_policy = "skip"
            "#,
        )
        .unwrap();
        assert_eq!(config.input_dir, PathBuf::from("raw"));
        assert_eq!(config.max_rows_per_file, 500);
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.output_dir, PathBuf::from("Combined_CSV"));
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        let err = PipelineConfig::from_toml_str("max_rows = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn overrides_replace_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_OUTPUT_DIR, "out"),
            (ENV_MAX_ROWS_PER_FILE, "42"),
            (ENV_WORKERS, "3"),
            (ENV_FAILURE_POLICY, "SKIP"),
        ]);
        let mut config = PipelineConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.max_rows_per_file, 42);
        assert_eq!(config.workers, 3);
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.input_dir, PathBuf::from("AIS_Sines"));
    }

    #[test]
    fn malformed_override_is_reported() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_MAX_ROWS_PER_FILE).then(|| "lots".to_string()))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, ENV_MAX_ROWS_PER_FILE);
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_cap_and_workers() {
        let mut config = PipelineConfig {
            max_rows_per_file: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
        config.max_rows_per_file = 10;
        config.workers = 0;
        assert!(config.validate().is_err());
        config.workers = 1;
        config.input_extension = ".".to_string();
        assert!(config.validate().is_err());
    }
}
