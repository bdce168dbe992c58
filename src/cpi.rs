//! Monthly Consumer Price Index table.
//!
//! Loaded from the BLS CSV export for CPI-U all items: twelve lines of
//! series metadata, then a header row and one row per year with the twelve
//! monthly index values plus the two half-year averages.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

/// Metadata lines before the header in the BLS export.
pub const PREAMBLE_ROWS: usize = 12;

/// Year column, twelve months, Half1 and Half2.
const COLUMNS: usize = 15;

#[derive(Debug, Error)]
pub enum CpiError {
    #[error("failed to open CPI file '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read CPI row: {0}")]
    Read(#[from] csv::Error),
    #[error("CPI row for year {year} has {got} columns, expected {want}")]
    ShortRow { year: i32, got: usize, want: usize },
    #[error("unreadable CPI value '{value}' at year {year}, column {column}")]
    BadCell {
        year: i32,
        column: String,
        value: String,
    },
    #[error("no CPI rows found in '{path}'")]
    Empty { path: String },
}

/// Index values keyed by `(year, month)`, with the half-year averages kept
/// alongside. Missing cells simply stay absent; lookups against them fail
/// and the affected ticker is rejected downstream.
#[derive(Debug, Clone, Default)]
pub struct CpiTable {
    months: BTreeMap<(i32, u32), f64>,
    halves: BTreeMap<(i32, u8), f64>,
}

impl CpiTable {
    pub fn from_csv_file(path: impl AsRef<Path>) -> Result<Self, CpiError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| CpiError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut table = CpiTable::default();
        for record in reader.records().skip(PREAMBLE_ROWS) {
            let record = record?;
            // The header row survives the preamble skip; anything without a
            // numeric year is a label row.
            let Some(Ok(year)) = record.get(0).map(str::parse::<i32>) else {
                continue;
            };
            if record.len() < COLUMNS {
                return Err(CpiError::ShortRow {
                    year,
                    got: record.len(),
                    want: COLUMNS,
                });
            }
            for month in 1..=12u32 {
                if let Some(value) = parse_cell(&record, month as usize, year)? {
                    table.months.insert((year, month), value);
                }
            }
            for (index, half) in [(13usize, 1u8), (14, 2)] {
                if let Some(value) = parse_cell(&record, index, year)? {
                    table.halves.insert((year, half), value);
                }
            }
        }

        if table.months.is_empty() {
            return Err(CpiError::Empty {
                path: path.display().to_string(),
            });
        }
        Ok(table)
    }

    pub fn get(&self, year: i32, month: u32) -> Option<f64> {
        self.months.get(&(year, month)).copied()
    }

    /// Half-year average (`half` is 1 or 2).
    pub fn half(&self, year: i32, half: u8) -> Option<f64> {
        self.halves.get(&(year, half)).copied()
    }

    pub fn months_len(&self) -> usize {
        self.months.len()
    }
}

fn parse_cell(
    record: &csv::StringRecord,
    index: usize,
    year: i32,
) -> Result<Option<f64>, CpiError> {
    let raw = record.get(index).unwrap_or("");
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|_| CpiError::BadCell {
        year,
        column: column_name(index),
        value: raw.to_string(),
    })
}

fn column_name(index: usize) -> String {
    match index {
        1..=12 => index.to_string(),
        13 => "Half1".to_string(),
        14 => "Half2".to_string(),
        other => format!("column {other}"),
    }
}

#[cfg(test)]
impl CpiTable {
    /// Hand-built table for tests that do not want to go through a file.
    pub(crate) fn with_months(entries: &[(i32, u32, f64)]) -> Self {
        let mut table = Self::default();
        for &(year, month, value) in entries {
            table.months.insert((year, month), value);
        }
        table
    }
}
