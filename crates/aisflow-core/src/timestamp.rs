use aisflow_parser::schema::BASE_DATE_TIME;
use chrono::NaiveDateTime;
use polars::prelude::*;
use thiserror::Error;

/// Output form of `BaseDateTime`. Zero-padded, so text order is time order.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

static INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error)]
pub enum TimestampError {
    /// `filtered_row` is the 0-based position among the rows that passed the
    /// filter, not a line of the input file.
    #[error("retained row {filtered_row}: unrecognized BaseDateTime '{value}'")]
    Unparseable { filtered_row: usize, value: String },
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

pub fn canonical_timestamp(value: &str) -> Option<String> {
    parse_timestamp(value).map(|dt| dt.format(CANONICAL_FORMAT).to_string())
}

/// Rewrites every non-null `BaseDateTime` into [`CANONICAL_FORMAT`].
///
/// Returns the number of values whose text changed. Tables without the
/// column are left as they are.
pub fn canonicalize_timestamps(df: &mut DataFrame) -> Result<usize, TimestampError> {
    if df.get_column_index(BASE_DATE_TIME).is_none() {
        return Ok(0);
    }

    let values = df.column(BASE_DATE_TIME)?.str()?;
    let mut rewritten = 0usize;
    let mut canonical: Vec<Option<String>> = Vec::with_capacity(values.len());

    for (filtered_row, value) in values.into_iter().enumerate() {
        let Some(value) = value else {
            canonical.push(None);
            continue;
        };
        let formatted = canonical_timestamp(value).ok_or_else(|| TimestampError::Unparseable {
            filtered_row,
            value: value.to_string(),
        })?;
        if formatted != value {
            rewritten += 1;
        }
        canonical.push(Some(formatted));
    }

    if rewritten > 0 {
        let text: Vec<Option<&str>> = canonical.iter().map(|v| v.as_deref()).collect();
        df.with_column(Series::new(BASE_DATE_TIME.into(), text))?;
    }

    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;

    #[test]
    fn canonical_values_are_unchanged() {
        assert_eq!(
            canonical_timestamp("2020-01-01T00:00:00").as_deref(),
            Some("2020-01-01T00:00:00")
        );
    }

    #[test]
    fn known_formats_are_rewritten() {
        let cases = [
            ("2020-01-01 00:10:00", "2020-01-01T00:10:00"),
            ("2020/01/02 03:04:05", "2020-01-02T03:04:05"),
            ("02/01/2020 03:04:05", "2020-01-02T03:04:05"),
            ("2020-01-01T00:10:00Z", "2020-01-01T00:10:00"),
            ("2020-01-01 00:10", "2020-01-01T00:10:00"),
            ("2020-01-01 00:10:00.5", "2020-01-01T00:10:00.500"),
        ];
        for (input, expected) in cases {
            assert_eq!(canonical_timestamp(input).as_deref(), Some(expected), "{input}");
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(canonical_timestamp("yesterday").is_none());
        assert!(canonical_timestamp("2020-13-01 00:00:00").is_none());
    }

    #[test]
    fn canonicalize_reports_offending_row() {
        let mut df = df!(
            BASE_DATE_TIME => [Some("2020-01-01 00:00:00"), None, Some("soon")],
        )
        .unwrap();
        let err = canonicalize_timestamps(&mut df).unwrap_err();
        match err {
            TimestampError::Unparseable {
                filtered_row,
                value,
            } => {
                assert_eq!(filtered_row, 2);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn canonicalize_rewrites_column_and_keeps_nulls() {
        let mut df = df!(
            BASE_DATE_TIME => [Some("2020-01-01 00:00:00"), None, Some("2020-01-01T00:00:01")],
            "Destination" => ["SINES", "SINES", "SINES"],
        )
        .unwrap();

        let rewritten = canonicalize_timestamps(&mut df).unwrap();

        assert_eq!(rewritten, 1);
        let ts = df.column(BASE_DATE_TIME).unwrap().str().unwrap();
        assert_eq!(ts.get(0), Some("2020-01-01T00:00:00"));
        assert_eq!(ts.get(1), None);
        assert_eq!(ts.get(2), Some("2020-01-01T00:00:01"));
        assert_eq!(df.get_column_names()[0].as_str(), BASE_DATE_TIME);
    }

    #[test]
    fn missing_column_is_a_no_op() {
        let mut df = df!("Destination" => ["SINES"]).unwrap();
        assert_eq!(canonicalize_timestamps(&mut df).unwrap(), 0);
    }
}
