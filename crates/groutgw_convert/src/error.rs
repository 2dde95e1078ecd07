//! Error types for GroutIt parsing

use crate::layout::HeaderField;
use thiserror::Error;

/// Validation failure for a single GroutIt export.
///
/// Every variant is file-scoped: the caller archives the offending file and
/// moves on. Line numbers are 1-based.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("File does not seem to contain any data ({rows} rows)")]
    NoData { rows: usize },

    #[error(
        "Input format not as expected ({field}): expected '{expected}' at line {line}, column {column}, found '{found}'"
    )]
    HeaderMismatch {
        field: HeaderField,
        expected: &'static str,
        line: usize,
        column: usize,
        found: String,
    },

    #[error("Failed to read export: {0}")]
    Read(#[from] csv::Error),

    #[error("Line {line} has {cells} cells, at most {max} expected")]
    TooManyColumns { line: usize, cells: usize, max: usize },

    #[error("Invalid header timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid time offset '{value}' at line {line}")]
    InvalidOffset { line: usize, value: String },

    #[error("Timestamp out of range at line {line} (offset {offset}s)")]
    TimestampOverflow { line: usize, offset: i64 },
}

impl ConvertError {
    /// Header field that failed validation, if any.
    pub fn header_field(&self) -> Option<HeaderField> {
        match self {
            ConvertError::HeaderMismatch { field, .. } => Some(*field),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ConvertError>;
