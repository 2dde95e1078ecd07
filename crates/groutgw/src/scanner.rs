//! One scan pass over the input directory.

use crate::cancel::CancellationToken;
use crate::error::ScanError;
use crate::processor::{FileOutcome, FileProcessor};
use crate::progress::Progress;
use crate::settings::ScanSettings;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Counts for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub files_found: usize,
    pub converted: usize,
    pub failed: usize,
    /// Failed files that could not be moved to the error directory.
    pub unarchived: usize,
    /// The pass ended early on a stop request.
    pub cancelled: bool,
}

/// What the scheduler runs on every tick.
pub trait ScanEngine: Send + Sync {
    fn run_pass(&self, progress: &Progress, token: &CancellationToken)
        -> Result<PassSummary, ScanError>;
}

pub struct DirectoryScanner {
    settings: Arc<ScanSettings>,
    processor: FileProcessor,
}

impl DirectoryScanner {
    pub fn new(settings: Arc<ScanSettings>) -> Self {
        let processor = FileProcessor::new(settings.clone());
        Self {
            settings,
            processor,
        }
    }

    /// Fails on the first configured directory that does not exist.
    pub fn check_directories(&self) -> Result<(), ScanError> {
        for (role, dir) in self.settings.directories() {
            if !dir.is_dir() {
                return Err(ScanError::MissingDirectory {
                    role,
                    path: dir.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Regular files directly in the input directory with the input extension.
    pub fn list_candidates(&self) -> Result<Vec<PathBuf>, ScanError> {
        let input = &self.settings.input_dir;
        let list_err = |source| ScanError::ListInput {
            path: input.clone(),
            source,
        };

        let mut candidates = Vec::new();
        for entry in fs::read_dir(input).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            if !entry.file_type().map_err(list_err)?.is_file() {
                continue;
            }
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext.eq_ignore_ascii_case(self.settings.input_extension()));
            if matches {
                candidates.push(path);
            }
        }
        Ok(candidates)
    }
}

impl ScanEngine for DirectoryScanner {
    fn run_pass(
        &self,
        progress: &Progress,
        token: &CancellationToken,
    ) -> Result<PassSummary, ScanError> {
        self.check_directories()?;
        let candidates = self.list_candidates()?;
        debug!(files = candidates.len(), "Scan pass listed input directory");

        let mut summary = PassSummary {
            files_found: candidates.len(),
            ..Default::default()
        };
        for path in candidates {
            if token.is_cancelled() {
                summary.cancelled = true;
                info!("Stop requested, ending scan pass early");
                break;
            }
            match self.processor.process(&path, progress) {
                FileOutcome::Converted(_) => summary.converted += 1,
                FileOutcome::Failed { archived, .. } => {
                    summary.failed += 1;
                    if !archived {
                        summary.unarchived += 1;
                    }
                }
            }
        }

        if summary.files_found > 0 {
            info!(
                found = summary.files_found,
                converted = summary.converted,
                failed = summary.failed,
                "Scan pass complete"
            );
        }
        Ok(summary)
    }
}
