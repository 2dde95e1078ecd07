//! Append-only activity log.

use chrono::NaiveDateTime;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default activity log file name, relative to the working directory.
pub const DEFAULT_ACTIVITY_LOG: &str = "GroutItToGwLog.txt";

/// Writes one `yyyy-MM-dd HH:mm:ss : message` line per entry.
///
/// The file is opened in append mode for every entry, so external tools may
/// rotate or truncate it while the service runs.
#[derive(Debug)]
pub struct ActivityLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, at: NaiveDateTime, message: &str) -> io::Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "activity log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{} : {}", at.format("%Y-%m-%d %H:%M:%S"), message)
    }
}
