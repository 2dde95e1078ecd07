//! Per-file state machine
//!
//! ```text
//! Discovered ─read─▶ Validating ─parse─▶ Converting ─encode─▶ Writing ─move─▶ Archived(Processed)
//!      └──────────────────┴────────────────────┴──────────────────┴─────────▶ Archived(Error)
//! ```
//!
//! Every failure is contained here: the caller gets a [`FileOutcome`], never
//! an error.

use crate::archive;
use crate::error::ProcessError;
use crate::progress::{Progress, ScanEventKind};
use crate::settings::ScanSettings;
use groutgw_convert::{encode, parse_file, render};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Processed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Discovered,
    Validating,
    Converting,
    Writing,
    Archived(ArchiveKind),
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileState::Discovered => f.write_str("discovered"),
            FileState::Validating => f.write_str("validating"),
            FileState::Converting => f.write_str("converting"),
            FileState::Writing => f.write_str("writing"),
            FileState::Archived(ArchiveKind::Processed) => f.write_str("archived (processed)"),
            FileState::Archived(ArchiveKind::Error) => f.write_str("archived (error)"),
        }
    }
}

/// Successful conversion of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    pub records: usize,
    pub rows: usize,
    pub output: PathBuf,
    pub archived: PathBuf,
}

#[derive(Debug)]
pub enum FileOutcome {
    Converted(Converted),
    /// `archived` is false when the move to the error directory failed too;
    /// the source is then still in the input directory.
    Failed { error: ProcessError, archived: bool },
}

impl FileOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, FileOutcome::Converted(_))
    }
}

/// Drives one source file through conversion and archiving.
#[derive(Debug, Clone)]
pub struct FileProcessor {
    settings: Arc<ScanSettings>,
}

impl FileProcessor {
    pub fn new(settings: Arc<ScanSettings>) -> Self {
        Self { settings }
    }

    /// `<output dir>/<source stem>.<output extension>`
    pub fn output_path(&self, source: &Path) -> PathBuf {
        // Only the last extension is swapped; dots inside the stem stay.
        let mut name = source
            .file_stem()
            .unwrap_or(source.as_os_str())
            .to_os_string();
        name.push(".");
        name.push(self.settings.output_extension());
        self.settings.output_dir.join(name)
    }

    pub fn process(&self, source: &Path, progress: &Progress) -> FileOutcome {
        let name = display_name(source);
        progress.emit(ScanEventKind::Processing { file: name.clone() });

        match self.convert_and_archive(source, &name) {
            Ok(converted) => {
                info!(
                    file = %name,
                    records = converted.records,
                    rows = converted.rows,
                    output = %converted.output.display(),
                    "Converted file"
                );
                progress.emit(ScanEventKind::Converted {
                    file: name,
                    records: converted.records,
                    rows: converted.rows,
                });
                FileOutcome::Converted(converted)
            }
            Err(error) => {
                warn!(file = %name, error = %error, "Failed to process file");
                progress.emit(ScanEventKind::FileFailed {
                    file: name.clone(),
                    error: error.to_string(),
                });
                let archived = self.archive_failed(source, &name, progress);
                FileOutcome::Failed { error, archived }
            }
        }
    }

    fn convert_and_archive(&self, source: &Path, name: &str) -> Result<Converted, ProcessError> {
        let mut state = FileState::Discovered;

        let content = fs::read(source).map_err(|source_err| ProcessError::Read {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        transition(name, &mut state, FileState::Validating);

        let file = parse_file(name, &content, &self.settings.parse_options())?;
        transition(name, &mut state, FileState::Converting);

        let rows = encode(&file);
        transition(name, &mut state, FileState::Writing);

        let output = self.output_path(source);
        archive::write_atomic(&output, render(&rows).as_bytes()).map_err(|e| {
            ProcessError::Write {
                path: output.clone(),
                source: e,
            }
        })?;

        let archived = archive::move_into(source, &self.settings.processed_dir).map_err(|e| {
            ProcessError::Archive {
                from: source.to_path_buf(),
                to: self.settings.processed_dir.clone(),
                source: e,
            }
        })?;
        transition(name, &mut state, FileState::Archived(ArchiveKind::Processed));

        Ok(Converted {
            records: file.records().len(),
            rows: rows.len(),
            output,
            archived,
        })
    }

    /// Best-effort move to the error directory.
    fn archive_failed(&self, source: &Path, name: &str, progress: &Progress) -> bool {
        match archive::move_into(source, &self.settings.error_dir) {
            Ok(dest) => {
                debug!(
                    file = %name,
                    state = %FileState::Archived(ArchiveKind::Error),
                    dest = %dest.display(),
                    "Moved to error directory"
                );
                true
            }
            Err(e) => {
                let error = ProcessError::Archive {
                    from: source.to_path_buf(),
                    to: self.settings.error_dir.clone(),
                    source: e,
                };
                warn!(file = %name, error = %error, "Could not move file to error directory");
                progress.emit(ScanEventKind::ArchiveFailed {
                    file: name.to_string(),
                    error: error.to_string(),
                });
                false
            }
        }
    }
}

fn transition(name: &str, state: &mut FileState, next: FileState) {
    debug!(file = %name, from = %state, to = %next, "File state");
    *state = next;
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
