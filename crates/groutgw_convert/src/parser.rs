//! GroutIt export parser
//!
//! Turns a [`RawTable`] into file metadata plus the filtered record
//! sequence. Out-of-sequence rows are dropped by comparing each offset
//! against an expected counter that advances by the output interval after
//! every accepted row, not by the row's own offset.

use crate::error::{ConvertError, Result};
use crate::layout::{
    HeaderField, RawTable, FIRST_DATA_ROW, FLOW_COL, META_ROW, MIN_ROWS, OFFSET_COL,
    PRESSURE_COL, VOLUME_COL,
};
use chrono::{Duration, NaiveDateTime};
use tracing::debug;

/// Header timestamp pattern (`dd/MM/yyyy HH:mm:ss`).
pub const HEADER_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Seconds an offset may lag the expected counter before the row counts as a
/// glitch.
pub const GLITCH_TOLERANCE_SECS: i64 = 1;

/// Length of the file extension stripped before deriving the phase.
const EXTENSION_LEN: usize = 4;

/// Options that shape parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Expected spacing between consecutive records, in minutes.
    pub output_interval_minutes: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            output_interval_minutes: 1,
        }
    }
}

/// File-level values from the metadata row and the file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub phase: String,
    pub site: String,
    pub transect: String,
    pub tranche_height: String,
    pub base_timestamp: NaiveDateTime,
}

/// One accepted data row. Values stay raw text until encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: NaiveDateTime,
    pub flow: String,
    pub pressure: String,
    pub volume: String,
}

/// A parsed export. The record sequence is fixed once parsing succeeds.
#[derive(Debug, Clone)]
pub struct GroutItFile {
    metadata: FileMetadata,
    records: Vec<Record>,
}

impl GroutItFile {
    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

/// Parse raw export bytes.
pub fn parse_file(file_name: &str, content: &[u8], options: &ParseOptions) -> Result<GroutItFile> {
    let table = RawTable::from_bytes(content)?;
    parse_table(file_name, &table, options)
}

/// Validate a table and extract metadata and records.
pub fn parse_table(file_name: &str, table: &RawTable, options: &ParseOptions) -> Result<GroutItFile> {
    if table.row_count() < MIN_ROWS {
        return Err(ConvertError::NoData {
            rows: table.row_count(),
        });
    }
    table.validate_headers()?;

    let metadata = parse_metadata(file_name, table)?;
    let records = parse_records(table, &metadata, options)?;

    debug!(
        file = file_name,
        site = %metadata.site,
        records = records.len(),
        "Parsed GroutIt export"
    );

    Ok(GroutItFile { metadata, records })
}

/// Trailing `_`-separated token of the file name without its extension.
pub fn phase_from_file_name(file_name: &str) -> String {
    let char_count = file_name.chars().count();
    let stem: String = file_name
        .chars()
        .take(char_count.saturating_sub(EXTENSION_LEN))
        .collect();
    stem.rsplit('_').next().unwrap_or_default().to_string()
}

fn meta_value(table: &RawTable, field: HeaderField) -> &str {
    field
        .value_column()
        .map(|col| table.cell(META_ROW, col))
        .unwrap_or("")
}

fn parse_metadata(file_name: &str, table: &RawTable) -> Result<FileMetadata> {
    let stamp = format!(
        "{} {}",
        meta_value(table, HeaderField::Date),
        meta_value(table, HeaderField::Time)
    );
    let base_timestamp = NaiveDateTime::parse_from_str(&stamp, HEADER_TIMESTAMP_FORMAT)
        .map_err(|source| ConvertError::InvalidTimestamp {
            value: stamp.clone(),
            source,
        })?;

    Ok(FileMetadata {
        phase: phase_from_file_name(file_name),
        site: meta_value(table, HeaderField::Site).to_string(),
        transect: meta_value(table, HeaderField::Transect).to_string(),
        tranche_height: meta_value(table, HeaderField::TrancheHeight).to_string(),
        base_timestamp,
    })
}

fn parse_records(
    table: &RawTable,
    metadata: &FileMetadata,
    options: &ParseOptions,
) -> Result<Vec<Record>> {
    let last_row = table.row_count() - 1;
    let step = i64::from(options.output_interval_minutes) * 60;
    let mut expected = 0i64;
    let mut records = Vec::new();

    for row in FIRST_DATA_ROW..table.row_count() {
        let cell = table.cell(row, OFFSET_COL);
        if cell.trim().is_empty() {
            continue;
        }
        let offset = parse_offset(row, cell)?;

        // First and last rows are kept unconditionally.
        let boundary = row == FIRST_DATA_ROW || row == last_row;
        if !boundary && offset - expected < -GLITCH_TOLERANCE_SECS {
            debug!(line = row + 1, offset, expected, "Dropping out-of-sequence row");
            continue;
        }

        let timestamp = metadata
            .base_timestamp
            .checked_add_signed(Duration::seconds(offset))
            .ok_or(ConvertError::TimestampOverflow {
                line: row + 1,
                offset,
            })?;

        records.push(Record {
            timestamp,
            flow: table.cell(row, FLOW_COL).to_string(),
            pressure: table.cell(row, PRESSURE_COL).to_string(),
            volume: table.cell(row, VOLUME_COL).to_string(),
        });
        expected += step;
    }

    Ok(records)
}

/// Offset cell in whole seconds, rounded half to even.
fn parse_offset(row: usize, cell: &str) -> Result<i64> {
    let invalid = || ConvertError::InvalidOffset {
        line: row + 1,
        value: cell.to_string(),
    };
    let value: f64 = cell.trim().parse().map_err(|_| invalid())?;
    let rounded = value.round_ties_even();
    if !rounded.is_finite() || rounded < f64::from(i32::MIN) || rounded > f64::from(i32::MAX) {
        return Err(invalid());
    }
    Ok(rounded as i64)
}
