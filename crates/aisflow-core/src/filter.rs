use aisflow_parser::schema::{CARGO, DESTINATION, SOURCE_NAME};
use polars::prelude::*;
use serde::Serialize;

pub const REQUIRED_DESTINATION: &str = "SINES";
pub const REQUIRED_SOURCE_NAME: &str = "AIS-SINES";
pub const REQUIRED_CARGO: &str = "Cargueiro";

/// Row counts before and after the business filter for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub rows_in: usize,
    pub rows_out: usize,
}

impl FilterStats {
    pub fn rows_dropped(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

/// Keeps the rows bound for Sines from the Sines receiver that carry cargo.
///
/// Comparisons are exact and case-sensitive. Nulls never match, and a table
/// lacking any of the three columns yields an empty table with the same schema.
pub fn filter_rows(df: &DataFrame) -> Result<(DataFrame, FilterStats), PolarsError> {
    let rows_in = df.height();

    let has_columns = [DESTINATION, SOURCE_NAME, CARGO]
        .iter()
        .all(|name| df.get_column_index(name).is_some());

    let filtered = if has_columns {
        df.clone()
            .lazy()
            .filter(
                col(DESTINATION)
                    .eq(lit(REQUIRED_DESTINATION))
                    .and(col(SOURCE_NAME).eq(lit(REQUIRED_SOURCE_NAME)))
                    .and(col(CARGO).eq(lit(REQUIRED_CARGO))),
            )
            .collect()?
    } else {
        df.clear()
    };

    let stats = FilterStats {
        rows_in,
        rows_out: filtered.height(),
    };
    Ok((filtered, stats))
}
