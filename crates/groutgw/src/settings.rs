//! Service settings
//!
//! Loaded from a TOML file (default `groutgw.toml`) on top of built-in
//! defaults, then overridden from the command line. Every field goes through
//! a setter, so the file and the flags are validated the same way.

use crate::error::{DirectoryRole, SettingsError};
use groutgw_convert::ParseOptions;
use groutgw_logging::DEFAULT_ACTIVITY_LOG;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "groutgw.toml";

const DEFAULT_SCAN_INTERVAL_SECS: u32 = 10;
const MAX_SCAN_INTERVAL_SECS: u32 = 3600;

/// Resolved settings for one service run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub error_dir: PathBuf,
    scan_interval_secs: u32,
    pub output_interval_minutes: u32,
    input_extension: String,
    output_extension: String,
    pub activity_log: PathBuf,
}

/// On-disk shape of the settings file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub processed_dir: Option<PathBuf>,
    pub error_dir: Option<PathBuf>,
    pub scan_interval_secs: Option<i64>,
    pub output_interval_minutes: Option<u32>,
    pub input_extension: Option<String>,
    pub output_extension: Option<String>,
    pub activity_log: Option<PathBuf>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            processed_dir: PathBuf::from("processed"),
            error_dir: PathBuf::from("error"),
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            output_interval_minutes: 1,
            input_extension: "csv".to_string(),
            output_extension: "txt".to_string(),
            activity_log: PathBuf::from(DEFAULT_ACTIVITY_LOG),
        }
    }
}

impl ScanSettings {
    /// Defaults overlaid with the given file. The file must exist.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: SettingsFile = toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut settings = Self::default();
        settings.apply(file);
        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Like [`ScanSettings::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        match Self::load(path) {
            Err(SettingsError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No settings file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Apply every key present in `file`.
    pub fn apply(&mut self, file: SettingsFile) {
        if let Some(dir) = file.input_dir {
            self.input_dir = dir;
        }
        if let Some(dir) = file.output_dir {
            self.output_dir = dir;
        }
        if let Some(dir) = file.processed_dir {
            self.processed_dir = dir;
        }
        if let Some(dir) = file.error_dir {
            self.error_dir = dir;
        }
        if let Some(secs) = file.scan_interval_secs {
            self.set_scan_interval_secs(secs);
        }
        if let Some(minutes) = file.output_interval_minutes {
            self.output_interval_minutes = minutes;
        }
        if let Some(ext) = file.input_extension {
            self.set_input_extension(&ext);
        }
        if let Some(ext) = file.output_extension {
            self.set_output_extension(&ext);
        }
        if let Some(path) = file.activity_log {
            self.activity_log = path;
        }
    }

    pub fn scan_interval_secs(&self) -> u32 {
        self.scan_interval_secs
    }

    /// Accepts values in (1, 3600]. Anything else keeps the previous value
    /// and returns `false`.
    pub fn set_scan_interval_secs(&mut self, secs: i64) -> bool {
        match u32::try_from(secs) {
            Ok(secs) if secs > 1 && secs <= MAX_SCAN_INTERVAL_SECS => {
                self.scan_interval_secs = secs;
                true
            }
            _ => {
                warn!(
                    requested = secs,
                    kept = self.scan_interval_secs,
                    "Scan interval must be within (1, {}] seconds",
                    MAX_SCAN_INTERVAL_SECS
                );
                false
            }
        }
    }

    pub fn input_extension(&self) -> &str {
        &self.input_extension
    }

    /// Stored without a leading dot; matching is ASCII case-insensitive.
    pub fn set_input_extension(&mut self, ext: &str) {
        self.input_extension = normalize_extension(ext);
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    pub fn set_output_extension(&mut self, ext: &str) {
        self.output_extension = normalize_extension(ext);
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            output_interval_minutes: self.output_interval_minutes,
        }
    }

    /// The four watched directories, in the order they are checked.
    pub fn directories(&self) -> [(DirectoryRole, &Path); 4] {
        [
            (DirectoryRole::Input, self.input_dir.as_path()),
            (DirectoryRole::Output, self.output_dir.as_path()),
            (DirectoryRole::Processed, self.processed_dir.as_path()),
            (DirectoryRole::Error, self.error_dir.as_path()),
        ]
    }

    /// Create any missing directory. Returns the ones created.
    pub fn ensure_directories(&self) -> io::Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        for (role, dir) in self.directories() {
            if !dir.is_dir() {
                fs::create_dir_all(dir)?;
                info!(%role, path = %dir.display(), "Created directory");
                created.push(dir.to_path_buf());
            }
        }
        Ok(created)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = ScanSettings::default();
        assert_eq!(settings.input_dir, PathBuf::from("input"));
        assert_eq!(settings.scan_interval_secs(), 10);
        assert_eq!(settings.output_interval_minutes, 1);
        assert_eq!(settings.input_extension(), "csv");
        assert_eq!(settings.output_extension(), "txt");
        assert_eq!(settings.activity_log, PathBuf::from("GroutItToGwLog.txt"));
    }

    #[test]
    fn test_scan_interval_bounds() {
        let mut settings = ScanSettings::default();
        assert!(!settings.set_scan_interval_secs(1));
        assert!(!settings.set_scan_interval_secs(0));
        assert!(!settings.set_scan_interval_secs(-5));
        assert!(!settings.set_scan_interval_secs(3601));
        assert_eq!(settings.scan_interval_secs(), 10);

        assert!(settings.set_scan_interval_secs(2));
        assert_eq!(settings.scan_interval_secs(), 2);
        assert!(settings.set_scan_interval_secs(3600));
        assert_eq!(settings.scan_interval_secs(), 3600);
    }

    #[test]
    fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("groutgw.toml");
        fs::write(
            &path,
            r#"
input_dir = "/data/in"
scan_interval_secs = 30
output_interval_minutes = 5
input_extension = ".CSV"
"#,
        )
        .unwrap();

        let settings = ScanSettings::load(&path).unwrap();
        assert_eq!(settings.input_dir, PathBuf::from("/data/in"));
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert_eq!(settings.scan_interval_secs(), 30);
        assert_eq!(settings.output_interval_minutes, 5);
        assert_eq!(settings.input_extension(), "CSV");
    }

    #[test]
    fn test_out_of_range_interval_in_file_keeps_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("groutgw.toml");
        fs::write(&path, "scan_interval_secs = 7200\n").unwrap();

        let settings = ScanSettings::load(&path).unwrap();
        assert_eq!(settings.scan_interval_secs(), 10);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("groutgw.toml");
        fs::write(&path, "input_folder = \"x\"\n").unwrap();

        let err = ScanSettings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.toml");

        assert!(matches!(
            ScanSettings::load(&path).unwrap_err(),
            SettingsError::Read { .. }
        ));
        assert_eq!(ScanSettings::load_or_default(&path).unwrap(), ScanSettings::default());
    }

    #[test]
    fn test_serialized_settings_load_back() {
        let mut settings = ScanSettings::default();
        settings.error_dir = PathBuf::from("/srv/rejected");
        settings.set_scan_interval_secs(60);

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("groutgw.toml");
        fs::write(&path, toml::to_string_pretty(&settings).unwrap()).unwrap();

        assert_eq!(ScanSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_ensure_directories_creates_missing_only() {
        let temp = TempDir::new().unwrap();
        let mut settings = ScanSettings::default();
        settings.input_dir = temp.path().join("in");
        settings.output_dir = temp.path().join("out");
        settings.processed_dir = temp.path().join("done");
        settings.error_dir = temp.path().join("bad");
        fs::create_dir(&settings.input_dir).unwrap();

        let created = settings.ensure_directories().unwrap();
        assert_eq!(created.len(), 3);
        for (_, dir) in settings.directories() {
            assert!(dir.is_dir());
        }
        assert!(settings.ensure_directories().unwrap().is_empty());
    }
}
