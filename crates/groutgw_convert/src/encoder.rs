//! GW measurement encoder
//!
//! Every record fans out into six channel rows. Stage, phase and height
//! repeat file-level values; volume, pressure and flow come from the record.

use crate::parser::{GroutItFile, Record};
use chrono::NaiveDateTime;
use std::fmt;

/// Output timestamp pattern (`dd/MM/yyyy HH:mm:ss`).
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Value written when a cell is not a number.
pub const INVALID_VALUE: f64 = 9999.0;

/// Constant trailing flag field.
pub const ROW_FLAG: &str = "0";

/// Measurement channel, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Stage,
    Phase,
    Volume,
    Pressure,
    FlowRate,
    Height,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Stage,
        Channel::Phase,
        Channel::Volume,
        Channel::Pressure,
        Channel::FlowRate,
        Channel::Height,
    ];

    /// Suffix appended to the site identifier.
    pub fn suffix(self) -> &'static str {
        match self {
            Channel::Stage => "_Stage",
            Channel::Phase => "_Phase",
            Channel::Volume => "_Vol",
            Channel::Pressure => "_Press",
            Channel::FlowRate => "_FlRate",
            Channel::Height => "_Height",
        }
    }

    pub fn decimals(self) -> usize {
        match self {
            Channel::Stage | Channel::Phase | Channel::Height => 0,
            Channel::Volume | Channel::Pressure | Channel::FlowRate => 2,
        }
    }

    fn raw_value<'a>(self, file: &'a GroutItFile, record: &'a Record) -> &'a str {
        let meta = file.metadata();
        match self {
            Channel::Stage => &meta.transect,
            Channel::Phase => &meta.phase,
            Channel::Volume => &record.volume,
            Channel::Pressure => &record.pressure,
            Channel::FlowRate => &record.flow,
            Channel::Height => &meta.tranche_height,
        }
    }
}

/// One line of a GW file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub channel: String,
    pub timestamp: NaiveDateTime,
    pub value: String,
}

impl fmt::Display for OutputRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.channel,
            self.timestamp.format(OUTPUT_TIMESTAMP_FORMAT),
            self.value,
            ROW_FLAG
        )
    }
}

/// Encode every retained record, six rows per record.
pub fn encode(file: &GroutItFile) -> Vec<OutputRow> {
    let site = &file.metadata().site;
    let mut rows = Vec::with_capacity(file.records().len() * Channel::ALL.len());

    for record in file.records() {
        for channel in Channel::ALL {
            rows.push(OutputRow {
                channel: format!("{}{}", site, channel.suffix()),
                timestamp: record.timestamp,
                value: format_value(channel.raw_value(file, record), channel.decimals()),
            });
        }
    }

    rows
}

/// Render rows as GW text, one `\n`-terminated line per row.
pub fn render(rows: &[OutputRow]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row.to_string());
        out.push('\n');
    }
    out
}

/// Format a raw cell with a fixed number of decimals.
///
/// Rounds half away from zero. Anything that is not a finite number becomes
/// [`INVALID_VALUE`].
pub fn format_value(raw: &str, decimals: usize) -> String {
    let value = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(INVALID_VALUE);

    let scale = 10f64.powi(decimals as i32);
    let scaled = value * scale;
    // Magnitudes this large have no fractional part left to round.
    let rounded = if scaled.is_finite() {
        scaled.round() / scale
    } else {
        value
    };
    // No "-0" / "-0.00" in the output.
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.*}", decimals, rounded)
}
