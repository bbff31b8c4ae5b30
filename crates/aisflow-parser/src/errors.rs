use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is empty or has no header row")]
    MissingHeader,

    #[error("header column {column_index} invalid: {message}")]
    InvalidHeader {
        column_index: usize,
        message: String,
    },

    #[error("data row on line {line} invalid: {message}")]
    DataRow { line: u64, message: String },

    #[error("CSV error: {0}")]
    Csv(#[source] csv::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

impl From<csv::Error> for ParserError {
    fn from(err: csv::Error) -> Self {
        if let csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } = err.kind()
        {
            return ParserError::DataRow {
                line: pos.as_ref().map(|p| p.line()).unwrap_or_default(),
                message: format!("expected {expected_len} fields, found {len}"),
            };
        }
        ParserError::Csv(err)
    }
}
