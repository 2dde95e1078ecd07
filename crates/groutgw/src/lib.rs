//! GroutIt → GW ingestion service
//!
//! Watches an input directory on a wall-clock schedule, converts every
//! GroutIt export it finds into a GW measurement file, and archives the
//! source into a processed or error directory.
//!
//! ```text
//! Scheduler ──tick──▶ DirectoryScanner ──file──▶ FileProcessor ──▶ groutgw_convert
//!     │                      │                         │
//!     └──────────────────────┴──── ScanEvent ──────────┴──▶ Progress ──▶ sinks
//! ```

pub mod archive;
pub mod cancel;
pub mod error;
pub mod processor;
pub mod progress;
pub mod scanner;
pub mod scheduler;
pub mod settings;

pub use cancel::CancellationToken;
pub use error::{DirectoryRole, ProcessError, Result, ScanError, SettingsError};
pub use processor::{ArchiveKind, Converted, FileOutcome, FileProcessor, FileState};
pub use progress::{Progress, ProgressSink, ScanEvent, ScanEventKind, TracingSink};
pub use scanner::{DirectoryScanner, PassSummary, ScanEngine};
pub use scheduler::{Clock, Scheduler, SchedulerConfig, SessionStats, StatsSnapshot, SystemClock};
pub use settings::{ScanSettings, SettingsFile, DEFAULT_SETTINGS_FILE};
