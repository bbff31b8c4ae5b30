use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::*;

use crate::errors::ParserError;

/// Delimiter used by the raw vessel-tracking exports.
pub const PIPE: u8 = b'|';
/// Delimiter used by transformed and dataset files.
pub const COMMA: u8 = b',';

const BOM: char = '\u{feff}';

/// Reads a delimited file with a header row into a frame of `String` columns.
pub fn read_delimited(path: &Path, delimiter: u8) -> Result<DataFrame, ParserError> {
    let file = File::open(path)?;
    parse_delimited(BufReader::new(file), delimiter)
}

/// Parses delimited text into a frame whose columns follow header order.
///
/// Every value is kept as read; empty fields become nulls. Ragged rows,
/// blank or duplicate header names, and undecodable input are errors.
pub fn parse_delimited<R: Read>(input: R, delimiter: u8) -> Result<DataFrame, ParserError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(input);

    let names = header_names(reader.headers()?)?;
    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];

    for record in reader.records() {
        let record = record?;
        for (column, field) in values.iter_mut().zip(record.iter()) {
            column.push(if field.is_empty() {
                None
            } else {
                Some(field.to_string())
            });
        }
    }

    let columns: Vec<Column> = names
        .iter()
        .zip(values.iter())
        .map(|(name, data)| {
            let text: Vec<Option<&str>> = data.iter().map(|v| v.as_deref()).collect();
            Series::new(name.as_str().into(), text).into()
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

fn header_names(header: &csv::StringRecord) -> Result<Vec<String>, ParserError> {
    if header.is_empty() || header.iter().all(str::is_empty) {
        return Err(ParserError::MissingHeader);
    }

    let mut seen = HashSet::with_capacity(header.len());
    let mut names = Vec::with_capacity(header.len());
    for (column_index, raw) in header.iter().enumerate() {
        let name = if column_index == 0 {
            raw.trim_start_matches(BOM)
        } else {
            raw
        };
        if name.trim().is_empty() {
            return Err(ParserError::InvalidHeader {
                column_index,
                message: "blank column name".to_string(),
            });
        }
        if !seen.insert(name.to_string()) {
            return Err(ParserError::InvalidHeader {
                column_index,
                message: format!("duplicate column name '{name}'"),
            });
        }
        names.push(name.to_string());
    }
    Ok(names)
}
