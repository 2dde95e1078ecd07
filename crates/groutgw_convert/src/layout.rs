//! Fixed GroutIt export layout
//!
//! A GroutIt export is a `;`-delimited table exactly [`COLUMN_COUNT`] cells
//! wide. Rows 0 and 2 hold labels, row 1 holds the file-level values and
//! data starts at row [`FIRST_DATA_ROW`].

use crate::error::{ConvertError, Result};
use csv::ReaderBuilder;
use std::fmt;

/// Cells per row.
pub const COLUMN_COUNT: usize = 20;

/// Cell delimiter.
pub const DELIMITER: u8 = b';';

/// Index of the first data row.
pub const FIRST_DATA_ROW: usize = 3;

/// Minimum number of rows (three header rows plus one data row).
pub const MIN_ROWS: usize = 4;

pub(crate) const META_ROW: usize = 1;
pub(crate) const OFFSET_COL: usize = 0;
pub(crate) const FLOW_COL: usize = 3;
pub(crate) const PRESSURE_COL: usize = 5;
pub(crate) const VOLUME_COL: usize = 7;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A labelled header cell at a fixed coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Site,
    Transect,
    TrancheHeight,
    Date,
    Time,
    Offset,
    Flow,
    Pressure,
    Volume,
}

impl HeaderField {
    /// Validation order.
    pub const ALL: [HeaderField; 9] = [
        HeaderField::Site,
        HeaderField::Transect,
        HeaderField::TrancheHeight,
        HeaderField::Date,
        HeaderField::Time,
        HeaderField::Offset,
        HeaderField::Flow,
        HeaderField::Pressure,
        HeaderField::Volume,
    ];

    /// `(row, column)` of the label cell.
    pub fn position(self) -> (usize, usize) {
        match self {
            HeaderField::Site => (0, 2),
            HeaderField::Transect => (0, 5),
            HeaderField::Date => (0, 12),
            HeaderField::Time => (0, 13),
            HeaderField::TrancheHeight => (0, 18),
            HeaderField::Offset => (2, OFFSET_COL),
            HeaderField::Flow => (2, FLOW_COL),
            HeaderField::Pressure => (2, PRESSURE_COL),
            HeaderField::Volume => (2, VOLUME_COL),
        }
    }

    /// Column holding the file-level value in row 1 (label row 0 only).
    pub fn value_column(self) -> Option<usize> {
        match self.position() {
            (0, col) => Some(col),
            _ => None,
        }
    }

    /// Exact label text the instrument writes.
    pub fn label(self) -> &'static str {
        match self {
            HeaderField::Site => "FORA",
            HeaderField::Transect => "TRAN",
            HeaderField::TrancheHeight => "HTRANCHE[ft]",
            HeaderField::Date => "DATE",
            HeaderField::Time => "TIME",
            HeaderField::Offset => "TPS[s]",
            HeaderField::Flow => "DEB[US gal/min]",
            HeaderField::Pressure => "PR[psi]",
            HeaderField::Volume => "VOL[US gal]",
        }
    }

    /// Short name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            HeaderField::Site => "FORA",
            HeaderField::Transect => "TRAN",
            HeaderField::TrancheHeight => "HTRANCHE",
            HeaderField::Date => "DATE",
            HeaderField::Time => "TIME",
            HeaderField::Offset => "TPS",
            HeaderField::Flow => "DEB",
            HeaderField::Pressure => "PR",
            HeaderField::Volume => "VOL",
        }
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Export split into rows of exactly [`COLUMN_COUNT`] cells.
#[derive(Debug, Clone)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Split raw export bytes into a padded table.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, a leading BOM is
    /// dropped and blank lines are not rows. Quotes carry no meaning. Cells
    /// past the fixed width are tolerated only when empty (trailing
    /// delimiters).
    pub fn from_bytes(content: &[u8]) -> Result<Self> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let mut reader = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(content);

        let mut rows = Vec::new();
        for result in reader.byte_records() {
            let record = result?;
            let line = record
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(rows.len() + 1);
            if record.len() > COLUMN_COUNT
                && record.iter().skip(COLUMN_COUNT).any(|cell| !cell.is_empty())
            {
                return Err(ConvertError::TooManyColumns {
                    line,
                    cells: record.len(),
                    max: COLUMN_COUNT,
                });
            }

            let mut cells: Vec<String> = record
                .iter()
                .take(COLUMN_COUNT)
                .map(|cell| String::from_utf8_lossy(cell).into_owned())
                .collect();
            cells.resize(COLUMN_COUNT, String::new());
            rows.push(cells);
        }

        Ok(Self { rows })
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_bytes(text.as_bytes())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell content, empty when the coordinate is outside the table.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Check every fixed label, failing on the first mismatch.
    pub fn validate_headers(&self) -> Result<()> {
        for field in HeaderField::ALL {
            let (row, col) = field.position();
            let found = self.cell(row, col);
            if found != field.label() {
                return Err(ConvertError::HeaderMismatch {
                    field,
                    expected: field.label(),
                    line: row + 1,
                    column: col + 1,
                    found: found.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_rows_are_padded() {
        let table = RawTable::from_text("a;b\nc").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, 1), "b");
        assert_eq!(table.cell(0, 19), "");
        assert_eq!(table.cell(1, 0), "c");
        assert_eq!(table.cell(5, 0), "");
    }

    #[test]
    fn test_crlf_and_bom_are_handled() {
        let table = RawTable::from_text("\u{feff}x;y\r\nz\r\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, 0), "x");
        assert_eq!(table.cell(0, 1), "y");
        assert_eq!(table.cell(1, 0), "z");
    }

    #[test]
    fn test_trailing_empty_cells_are_tolerated() {
        let line = vec!["v"; COLUMN_COUNT].join(";") + ";;";
        let table = RawTable::from_text(&line).unwrap();
        assert_eq!(table.cell(0, COLUMN_COUNT - 1), "v");
    }

    #[test]
    fn test_overwide_row_is_rejected() {
        let line = vec!["v"; COLUMN_COUNT + 1].join(";");
        let err = RawTable::from_text(&format!("ok\n{line}")).unwrap_err();
        match err {
            ConvertError::TooManyColumns { line, cells, .. } => {
                assert_eq!(line, 2);
                assert_eq!(cells, COLUMN_COUNT + 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_lines_are_not_rows() {
        let table = RawTable::from_text("a;b\n\n\nc;d\n").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 1), "d");
    }

    #[test]
    fn test_quotes_are_literal() {
        let table = RawTable::from_text("\"a;b\";c").unwrap();
        assert_eq!(table.cell(0, 0), "\"a");
        assert_eq!(table.cell(0, 1), "b\"");
        assert_eq!(table.cell(0, 2), "c");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let table = RawTable::from_bytes(b"ok;\xFFbad\n").unwrap();
        assert_eq!(table.cell(0, 0), "ok");
        assert_eq!(table.cell(0, 1), "\u{fffd}bad");
    }

    #[test]
    fn test_header_positions_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for field in HeaderField::ALL {
            assert!(seen.insert(field.position()), "duplicate position for {field}");
        }
        assert_eq!(HeaderField::Date.value_column(), Some(12));
        assert_eq!(HeaderField::Volume.value_column(), None);
    }
}
