#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use aisflow_parser::{read_delimited, COMMA};
use polars::prelude::*;

pub const LEGACY_HEADER: &str = "UTCDate|long|lat|tipo_cod|comprimento|largura|calado|SOGKnots|COGDegrees|tipo_desc|ETA|Destination|SourceName|MMSI";

#[derive(Debug, Clone)]
pub struct Ping {
    pub timestamp: String,
    pub destination: String,
    pub source: String,
    pub cargo: String,
    pub mmsi: String,
}

impl Ping {
    /// A ping that passes the business filter.
    pub fn sines(timestamp: &str, mmsi: &str) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            destination: "SINES".to_string(),
            source: "AIS-SINES".to_string(),
            cargo: "Cargueiro".to_string(),
            mmsi: mmsi.to_string(),
        }
    }

    pub fn with_destination(mut self, destination: &str) -> Self {
        self.destination = destination.to_string();
        self
    }

    pub fn with_cargo(mut self, cargo: &str) -> Self {
        self.cargo = cargo.to_string();
        self
    }

    fn line(&self) -> String {
        format!(
            "{}|-8.8721|37.9502|70|180|30|9.5|12.1|45.0|{}|01-01 06:00|{}|{}|{}",
            self.timestamp, self.cargo, self.destination, self.source, self.mmsi
        )
    }
}

pub fn write_legacy_file(dir: &Path, name: &str, pings: &[Ping]) -> PathBuf {
    let mut content = String::from(LEGACY_HEADER);
    content.push('\n');
    for ping in pings {
        content.push_str(&ping.line());
        content.push('\n');
    }
    let path = dir.join(name);
    fs::write(&path, content).expect("write input fixture");
    path
}

/// `count` qualifying pings, one minute apart, newest first.
pub fn descending_pings(day: u32, count: usize, mmsi_prefix: &str) -> Vec<Ping> {
    (0..count)
        .rev()
        .map(|minute| {
            Ping::sines(
                &format!("2020-01-{day:02} 00:{minute:02}:00"),
                &format!("{mmsi_prefix}{minute:03}"),
            )
        })
        .collect()
}

pub fn read_csv(path: &Path) -> DataFrame {
    read_delimited(path, COMMA).expect("read output csv")
}

pub fn string_column(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .expect("column present")
        .str()
        .expect("string column")
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

pub fn assert_sorted_by_timestamp(df: &DataFrame) {
    let values = string_column(df, "BaseDateTime");
    for pair in values.windows(2) {
        assert!(pair[0] <= pair[1], "out of order: {:?} > {:?}", pair[0], pair[1]);
    }
}
