use polars::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::errors::ParserError;

pub const BASE_DATE_TIME: &str = "BaseDateTime";
pub const CARGO: &str = "Cargo";
pub const DESTINATION: &str = "Destination";
pub const SOURCE_NAME: &str = "SourceName";

/// Legacy export names and the canonical names they map to.
pub const RENAME_MAP: [(&str, &str); 10] = [
    ("UTCDate", BASE_DATE_TIME),
    ("long", "LON"),
    ("lat", "LAT"),
    ("tipo_cod", "VesselType"),
    ("comprimento", "Length"),
    ("largura", "Width"),
    ("calado", "Draft"),
    ("SOGKnots", "SOG"),
    ("COGDegrees", "COG"),
    ("tipo_desc", CARGO),
];

pub const CANONICAL_COLUMNS: [&str; 13] = [
    BASE_DATE_TIME,
    "LON",
    "LAT",
    "VesselType",
    "Length",
    "Width",
    "Draft",
    "SOG",
    "COG",
    CARGO,
    "ETA",
    DESTINATION,
    SOURCE_NAME,
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub applied: Vec<(String, String)>,
    /// Renames skipped because the canonical column already existed.
    pub conflicts: Vec<(String, String)>,
}

/// Returns the canonical name for a legacy column, if it has one.
pub fn canonical_name(legacy: &str) -> Option<&'static str> {
    RENAME_MAP
        .iter()
        .find(|(from, _)| *from == legacy)
        .map(|(_, to)| *to)
}

/// Renames legacy columns. Absent legacy columns are skipped; rows and values
/// are never touched.
///
/// The frame is rebuilt from the renamed columns so its cached schema carries
/// the new names.
pub fn normalize_schema(df: &mut DataFrame) -> Result<RenameReport, ParserError> {
    let mut report = RenameReport::default();
    let mut columns = df.get_columns().to_vec();

    for (from, to) in RENAME_MAP {
        let Some(index) = df.get_column_index(from) else {
            continue;
        };
        if df.get_column_index(to).is_some() {
            warn!(
                legacy = from,
                canonical = to,
                "both legacy and canonical columns present; keeping canonical"
            );
            report.conflicts.push((from.to_string(), to.to_string()));
            continue;
        }
        columns[index].rename(to.into());
        report.applied.push((from.to_string(), to.to_string()));
    }

    if !report.applied.is_empty() {
        *df = DataFrame::new(columns)?;
    }

    Ok(report)
}
