//! Progress events and the sinks that receive them.
//!
//! Events are delivered synchronously on the worker thread, in the order
//! they happen. A sink must not block for long.

use chrono::{Local, NaiveDateTime};
use groutgw_logging::ActivityLog;
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::{info, warn};

/// Default text of the stop event.
pub const DEFAULT_STOP_MESSAGE: &str = "Scanning for files stopped.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEventKind {
    Started,
    Processing {
        file: String,
    },
    Converted {
        file: String,
        records: usize,
        rows: usize,
    },
    FileFailed {
        file: String,
        error: String,
    },
    ArchiveFailed {
        file: String,
        error: String,
    },
    PassAborted {
        error: String,
    },
    Stopped {
        reason: Option<String>,
    },
}

impl ScanEventKind {
    /// Failures a user should look at.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ScanEventKind::FileFailed { .. }
                | ScanEventKind::ArchiveFailed { .. }
                | ScanEventKind::PassAborted { .. }
        )
    }
}

impl fmt::Display for ScanEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEventKind::Started => f.write_str("Scanning for files started..."),
            ScanEventKind::Processing { file } => write!(f, "Processing {}", file),
            ScanEventKind::Converted {
                file,
                records,
                rows,
            } => write!(f, "Converted {} ({} records, {} rows)", file, records, rows),
            ScanEventKind::FileFailed { file, error } => {
                write!(f, "Error processing {}: {}", file, error)
            }
            ScanEventKind::ArchiveFailed { file, error } => {
                write!(f, "Could not archive {}: {}", file, error)
            }
            ScanEventKind::PassAborted { error } => write!(f, "Scan pass aborted: {}", error),
            ScanEventKind::Stopped { reason } => {
                f.write_str(reason.as_deref().unwrap_or(DEFAULT_STOP_MESSAGE))
            }
        }
    }
}

/// A progress event stamped with local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub at: NaiveDateTime,
    pub kind: ScanEventKind,
}

impl ScanEvent {
    pub fn now(kind: ScanEventKind) -> Self {
        Self {
            at: Local::now().naive_local(),
            kind,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: &ScanEvent);
}

impl ProgressSink for Sender<ScanEvent> {
    fn notify(&self, event: &ScanEvent) {
        // Receiver gone: nobody is listening any more.
        let _ = self.send(event.clone());
    }
}

impl ProgressSink for ActivityLog {
    fn notify(&self, event: &ScanEvent) {
        if let Err(e) = self.append(event.at, &event.message()) {
            warn!(path = %self.path().display(), error = %e, "Failed to write activity log");
        }
    }
}

/// Mirrors events into `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn notify(&self, event: &ScanEvent) {
        if event.kind.is_failure() {
            warn!(target: "groutgw::progress", "{}", event.kind);
        } else {
            info!(target: "groutgw::progress", "{}", event.kind);
        }
    }
}

/// Fan-out to every registered sink.
#[derive(Default, Clone)]
pub struct Progress {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn ProgressSink>) {
        self.sinks.push(sink);
    }

    /// Stamp `kind` with the current time and deliver it.
    pub fn emit(&self, kind: ScanEventKind) -> ScanEvent {
        let event = ScanEvent::now(kind);
        for sink in &self.sinks {
            sink.notify(&event);
        }
        event
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    #[test]
    fn test_messages() {
        let cases = [
            (ScanEventKind::Started, "Scanning for files started..."),
            (
                ScanEventKind::Processing {
                    file: "a.csv".into(),
                },
                "Processing a.csv",
            ),
            (
                ScanEventKind::Converted {
                    file: "a.csv".into(),
                    records: 2,
                    rows: 12,
                },
                "Converted a.csv (2 records, 12 rows)",
            ),
            (
                ScanEventKind::FileFailed {
                    file: "a.csv".into(),
                    error: "boom".into(),
                },
                "Error processing a.csv: boom",
            ),
            (
                ScanEventKind::PassAborted {
                    error: "Input directory not found: in".into(),
                },
                "Scan pass aborted: Input directory not found: in",
            ),
            (
                ScanEventKind::Stopped { reason: None },
                "Scanning for files stopped.",
            ),
            (
                ScanEventKind::Stopped {
                    reason: Some("Interrupted by signal".into()),
                },
                "Interrupted by signal",
            ),
        ];
        for (kind, expected) in cases {
            assert_eq!(kind.to_string(), expected);
        }
    }

    #[test]
    fn test_fan_out_preserves_order() {
        let (tx_a, rx_a) = mpsc::channel();
        let (tx_b, rx_b) = mpsc::channel();
        let progress = Progress::new().with_sink(tx_a).with_sink(tx_b);

        progress.emit(ScanEventKind::Started);
        progress.emit(ScanEventKind::Stopped { reason: None });

        for rx in [rx_a, rx_b] {
            let kinds: Vec<_> = rx.try_iter().map(|e| e.kind).collect();
            assert_eq!(
                kinds,
                vec![ScanEventKind::Started, ScanEventKind::Stopped { reason: None }]
            );
        }
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let progress = Progress::new().with_sink(tx);
        progress.emit(ScanEventKind::Started);
    }

    #[test]
    fn test_activity_log_sink() {
        let temp = TempDir::new().unwrap();
        let log = ActivityLog::new(temp.path().join("log.txt"));
        let path = log.path().to_path_buf();
        let progress = Progress::new().with_sink(log);

        let event = progress.emit(ScanEventKind::Processing {
            file: "F1_2.csv".into(),
        });

        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            format!("{} : Processing F1_2.csv\n", event.at.format("%Y-%m-%d %H:%M:%S"))
        );
    }
}
