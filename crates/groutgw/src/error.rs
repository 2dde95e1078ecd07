//! Error types for the ingestion service

use groutgw_convert::ConvertError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// One of the four configured directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryRole {
    Input,
    Output,
    Processed,
    Error,
}

impl fmt::Display for DirectoryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DirectoryRole::Input => "Input",
            DirectoryRole::Output => "Output",
            DirectoryRole::Processed => "Processed",
            DirectoryRole::Error => "Error",
        })
    }
}

/// Failure while driving a single file. Never escapes that file's handling.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("Failed to write output {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    Archive {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure that aborts a whole scan pass.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{role} directory not found: {}", .path.display())]
    MissingDirectory { role: DirectoryRole, path: PathBuf },

    #[error("Failed to list input directory {}: {source}", .path.display())]
    ListInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure loading the settings file.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Result type alias
pub type Result<T, E = ProcessError> = std::result::Result<T, E>;
