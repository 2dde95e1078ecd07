//! GroutIt → GW conversion
//!
//! Pure conversion layer: no filesystem access and no timing. The service
//! crate drives it one file at a time.
//!
//! ```text
//! bytes ──▶ RawTable ──▶ validate headers ──▶ GroutItFile ──▶ encode ──▶ OutputRow ×6/record
//! ```

pub mod encoder;
pub mod error;
pub mod layout;
pub mod parser;

pub use encoder::{encode, format_value, render, Channel, OutputRow};
pub use error::{ConvertError, Result};
pub use layout::{HeaderField, RawTable, COLUMN_COUNT};
pub use parser::{parse_file, parse_table, FileMetadata, GroutItFile, ParseOptions, Record};

/// Parse and encode in one step.
pub fn convert(file_name: &str, content: &[u8], options: &ParseOptions) -> Result<Vec<OutputRow>> {
    let file = parse_file(file_name, content, options)?;
    Ok(encode(&file))
}
